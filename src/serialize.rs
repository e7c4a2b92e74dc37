//! Serializer backend: renders a validated tree to the canonical JSON form.
//!
//! The canonical form is the persisted interchange format and round-trips
//! through normalization: `{"freight": {"gt": 100}}`, `{"shipCity":
//! "Chicago"}` for implicit equality, `{"and": [...]}` for compositions that
//! cannot be merged into one object.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::backend::{dispatch, BackendContext, FilterBackend};
use crate::error::{FilterError, FilterResult};
use crate::node::{
    ComparisonNode, FilterNode, LiteralExpr, LogicalNode, OperandExpr, PassthroughNode,
    PropertyPathExpr, QuantifiedNode, UnaryNode,
};
use crate::operator::{ComparisonOp, LogicalOp};
use crate::schema::SchemaRef;

/// Serialization options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Translate property paths to the server-side naming convention
    pub server: bool,
    /// Always emit literals as `{value, dataType}` wrappers
    pub explicit_data_type: bool,
}

impl FilterNode {
    /// Render the canonical JSON form with default options and no schema
    pub fn to_json(&self) -> FilterResult<Value> {
        self.to_json_with(SerializeOptions::default(), None)
    }

    /// Render the canonical JSON form
    pub fn to_json_with(
        &self,
        options: SerializeOptions,
        schema: Option<&SchemaRef>,
    ) -> FilterResult<Value> {
        dispatch(
            &SerializerBackend { options },
            self,
            &BackendContext::new(schema),
        )
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "<invalid filter>"),
        }
    }
}

struct SerializerBackend {
    options: SerializeOptions,
}

impl FilterBackend for SerializerBackend {
    type Output = Value;

    fn passthrough(&self, node: &PassthroughNode, _: &BackendContext) -> FilterResult<Value> {
        Ok(Value::String(node.text.clone()))
    }

    fn unary(&self, node: &UnaryNode, ctx: &BackendContext) -> FilterResult<Value> {
        let operand = dispatch(self, &node.operand, ctx)?;
        Ok(single_entry(node.op.key(), operand))
    }

    fn logical(&self, node: &LogicalNode, ctx: &BackendContext) -> FilterResult<Value> {
        let children: Vec<Value> = node
            .children
            .iter()
            .map(|child| dispatch(self, child, ctx))
            .collect::<FilterResult<_>>()?;

        // A two-way conjunction of object forms merges into one object when
        // no key collides; otherwise fall back to the explicit array form
        if node.op == LogicalOp::And && children.len() == 2 {
            if let (Value::Object(first), Value::Object(second)) = (&children[0], &children[1]) {
                if let Some(merged) = deep_merge(first, second) {
                    return Ok(Value::Object(merged));
                }
            }
        }

        Ok(single_entry(node.op.key(), Value::Array(children)))
    }

    fn comparison(&self, node: &ComparisonNode, ctx: &BackendContext) -> FilterResult<Value> {
        let key = self.operand_key(&node.left, ctx)?;
        let value = self.operand_value(&node.right, ctx)?;
        // Implicit equality renders without an operator wrapper
        if node.op == ComparisonOp::Eq {
            Ok(single_entry(&key, value))
        } else {
            Ok(single_entry(&key, single_entry(node.op.key(), value)))
        }
    }

    fn quantified(&self, node: &QuantifiedNode, ctx: &BackendContext) -> FilterResult<Value> {
        let key = self.operand_key(&node.collection, ctx)?;
        let body_ctx = ctx.element(node.element_schema(ctx.schema.as_ref()));
        let body = dispatch(self, &node.body, &body_ctx)?;
        Ok(single_entry(&key, single_entry(node.op.key(), body)))
    }
}

impl SerializerBackend {
    /// Render an operand in key position: a property path or function text
    fn operand_key(&self, expr: &OperandExpr, ctx: &BackendContext) -> FilterResult<String> {
        match expr {
            OperandExpr::Property(prop) => Ok(self.property_path(prop, ctx)),
            OperandExpr::FunctionCall(_) => self.function_text(expr, ctx),
            // Unreachable past validation; kept as a typed failure
            OperandExpr::Literal(lit) => Err(FilterError::LiteralComparisonTarget {
                literal: lit.value.to_string(),
            }),
        }
    }

    /// Render an operand in value position
    fn operand_value(&self, expr: &OperandExpr, ctx: &BackendContext) -> FilterResult<Value> {
        match expr {
            OperandExpr::Literal(lit) => {
                if lit.has_explicit_data_type || self.options.explicit_data_type {
                    let mut map = Map::new();
                    map.insert("value".to_string(), lit.value.clone());
                    if let Some(data_type) = lit.data_type {
                        map.insert("dataType".to_string(), json!(data_type.name()));
                    }
                    Ok(Value::Object(map))
                } else {
                    Ok(lit.value.clone())
                }
            }
            // A property on the right is wrapped so re-parsing does not take
            // it for a literal
            OperandExpr::Property(prop) => Ok(json!({
                "value": self.property_path(prop, ctx),
                "isProperty": true,
            })),
            OperandExpr::FunctionCall(_) => Ok(Value::String(self.function_text(expr, ctx)?)),
        }
    }

    fn property_path(&self, prop: &PropertyPathExpr, ctx: &BackendContext) -> String {
        if self.options.server {
            if let Some(schema) = ctx.schema.as_ref() {
                return schema.server_path(&prop.path);
            }
        }
        prop.path.clone()
    }

    /// Textual reconstruction of a function call; the inverse of the parser
    fn function_text(&self, expr: &OperandExpr, ctx: &BackendContext) -> FilterResult<String> {
        match expr {
            OperandExpr::FunctionCall(call) => {
                let args: Vec<String> = call
                    .args
                    .iter()
                    .map(|arg| self.function_text(arg, ctx))
                    .collect::<FilterResult<_>>()?;
                Ok(format!("{}({})", call.name, args.join(",")))
            }
            OperandExpr::Property(prop) => Ok(self.property_path(prop, ctx)),
            OperandExpr::Literal(lit) => Ok(literal_text(lit)),
        }
    }
}

fn literal_text(lit: &LiteralExpr) -> String {
    match &lit.value {
        Value::String(s) if s.contains('\'') => format!("\"{}\"", s),
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Recursively union two objects. Any key collision whose values cannot
/// themselves be merged aborts the whole merge.
fn deep_merge(first: &Map<String, Value>, second: &Map<String, Value>) -> Option<Map<String, Value>> {
    let mut merged = first.clone();
    for (key, value) in second {
        let entry = match (merged.get(key), value) {
            (None, _) => value.clone(),
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming)?)
            }
            _ => return None,
        };
        merged.insert(key.clone(), entry);
    }
    Some(merged)
}
