//! Schema descriptions used to resolve property paths and data types.
//!
//! The engine never owns a schema; it consumes any `EntitySchema`
//! implementation through a shared reference. `MapSchema` is the map-backed
//! implementation used in tests and by callers without their own metadata
//! layer; `AnonymousSchema` carries comparison options without any property
//! knowledge.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// Shared handle to a schema. Identity (pointer equality) is what the
/// validation memo keys on.
pub type SchemaRef = Arc<dyn EntitySchema>;

/// String comparison policy applied by the evaluator.
///
/// `trim_before_compare` gives SQL-92 style semantics where trailing
/// whitespace does not participate in equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringCompareOptions {
    pub case_sensitive: bool,
    pub trim_before_compare: bool,
}

impl Default for StringCompareOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            trim_before_compare: true,
        }
    }
}

/// Result of resolving a property path against a schema
#[derive(Clone)]
pub enum ResolvedProperty {
    /// A data-valued property of the given type
    Data(DataType),
    /// A navigation property leading to another schema
    Navigation(SchemaRef),
}

impl fmt::Debug for ResolvedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedProperty::Data(dt) => f.debug_tuple("Data").field(dt).finish(),
            ResolvedProperty::Navigation(s) => {
                f.debug_tuple("Navigation").field(&s.name()).finish()
            }
        }
    }
}

/// External schema provider consumed by the validator and the backends.
pub trait EntitySchema: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Resolve a (possibly dotted) property path
    fn resolve_property(&self, path: &str) -> Option<ResolvedProperty>;

    /// Whether this schema carries no property knowledge
    fn is_anonymous(&self) -> bool {
        false
    }

    /// Translate a property path to the server-side naming convention
    fn server_path(&self, path: &str) -> String {
        path.to_string()
    }

    /// String comparison policy for records of this schema
    fn string_options(&self) -> StringCompareOptions {
        StringCompareOptions::default()
    }
}

/// Pointer identity of a schema handle, used as the validation memo key.
pub(crate) fn schema_identity(schema: &SchemaRef) -> usize {
    Arc::as_ptr(schema) as *const () as usize
}

/// Property declaration for a `MapSchema`
#[derive(Clone)]
pub enum PropertyDef {
    Data(DataType),
    Navigation(SchemaRef),
}

/// Map-backed schema implementation.
pub struct MapSchema {
    name: String,
    properties: HashMap<String, PropertyDef>,
    server_names: HashMap<String, String>,
    options: StringCompareOptions,
}

impl MapSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            server_names: HashMap::new(),
            options: StringCompareOptions::default(),
        }
    }

    /// Declare a data-valued property
    pub fn with_property(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.properties
            .insert(name.into(), PropertyDef::Data(data_type));
        self
    }

    /// Declare a navigation property leading to another schema
    pub fn with_navigation(mut self, name: impl Into<String>, target: SchemaRef) -> Self {
        self.properties
            .insert(name.into(), PropertyDef::Navigation(target));
        self
    }

    /// Map a property to a different server-side name
    pub fn with_server_name(
        mut self,
        name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        self.server_names.insert(name.into(), server_name.into());
        self
    }

    pub fn with_string_options(mut self, options: StringCompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl EntitySchema for MapSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve_property(&self, path: &str) -> Option<ResolvedProperty> {
        match path.split_once('.') {
            None => self.properties.get(path).map(|def| match def {
                PropertyDef::Data(dt) => ResolvedProperty::Data(*dt),
                PropertyDef::Navigation(target) => ResolvedProperty::Navigation(target.clone()),
            }),
            Some((head, rest)) => match self.properties.get(head)? {
                PropertyDef::Navigation(target) => target.resolve_property(rest),
                PropertyDef::Data(_) => None,
            },
        }
    }

    fn server_path(&self, path: &str) -> String {
        match path.split_once('.') {
            None => self
                .server_names
                .get(path)
                .cloned()
                .unwrap_or_else(|| path.to_string()),
            Some((head, rest)) => {
                let translated_head = self
                    .server_names
                    .get(head)
                    .cloned()
                    .unwrap_or_else(|| head.to_string());
                let translated_rest = match self.properties.get(head) {
                    Some(PropertyDef::Navigation(target)) => target.server_path(rest),
                    _ => rest.to_string(),
                };
                format!("{}.{}", translated_head, translated_rest)
            }
        }
    }

    fn string_options(&self) -> StringCompareOptions {
        self.options
    }
}

/// Schema with no property knowledge, carrying only comparison options.
///
/// Property paths validate as unresolved rather than failing, matching the
/// behavior of an absent schema.
#[derive(Default)]
pub struct AnonymousSchema {
    options: StringCompareOptions,
}

impl AnonymousSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string_options(mut self, options: StringCompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl EntitySchema for AnonymousSchema {
    fn name(&self) -> &str {
        "<anonymous>"
    }

    fn resolve_property(&self, _path: &str) -> Option<ResolvedProperty> {
        None
    }

    fn is_anonymous(&self) -> bool {
        true
    }

    fn string_options(&self) -> StringCompareOptions {
        self.options
    }
}
