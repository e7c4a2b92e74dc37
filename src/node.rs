//! Filter tree node definitions and construction.
//!
//! The tree is a closed set of immutable variants in two tiers: predicates
//! (`FilterNode`) are boolean-valued, operands (`OperandExpr`) are
//! value-valued and always sit under a predicate. Construction goes through
//! factory functions that may hand back a different, already-canonical node
//! when a collapse rule applies.

use std::fmt;

use parking_lot::Mutex;
use serde_json::Value;

use crate::datatype::DataType;
use crate::error::{FilterError, FilterResult};
use crate::functions::{self, FunctionEntry};
use crate::operator::{ComparisonOp, LogicalOp, QuantifierOp, UnaryOp};
use crate::schema::SchemaRef;

/// Per-node validation memo.
///
/// Stores the identity of the last schema validated against plus any
/// annotations that validation derived. Re-validating with the same schema is
/// a no-op; an absent schema is never memoized and always re-runs.
pub(crate) struct ValidationCell<T> {
    inner: Mutex<CellState<T>>,
}

#[derive(Clone)]
struct CellState<T> {
    schema: Option<usize>,
    data: T,
}

impl<T: Default> Default for ValidationCell<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(CellState {
                schema: None,
                data: T::default(),
            }),
        }
    }
}

impl<T: Clone> Clone for ValidationCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Mutex::new(self.inner.lock().clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ValidationCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ValidationCell")
            .field("schema", &state.schema)
            .field("data", &state.data)
            .finish()
    }
}

impl<T: Clone> ValidationCell<T> {
    pub(crate) fn is_validated_for(&self, schema: Option<usize>) -> bool {
        match schema {
            Some(id) => self.inner.lock().schema == Some(id),
            None => false,
        }
    }

    pub(crate) fn store(&self, schema: Option<usize>, data: T) {
        let mut state = self.inner.lock();
        state.schema = schema;
        state.data = data;
    }

    pub(crate) fn data(&self) -> T {
        self.inner.lock().data.clone()
    }
}

/// Annotations derived by validating a property path
#[derive(Clone, Default)]
pub(crate) struct PropertyState {
    pub(crate) data_type: Option<DataType>,
    pub(crate) target: Option<SchemaRef>,
}

impl fmt::Debug for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyState")
            .field("data_type", &self.data_type)
            .field("target", &self.target.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

/// Annotations derived by validating a comparison
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ComparisonState {
    pub(crate) operand_type: Option<DataType>,
}

/// A boolean-valued filter tree node
#[derive(Debug, Clone)]
pub enum FilterNode {
    Passthrough(PassthroughNode),
    Unary(UnaryNode),
    Logical(LogicalNode),
    Comparison(ComparisonNode),
    Quantified(QuantifiedNode),
}

/// Opaque pre-formed filter text; serialized back out verbatim, never
/// evaluated locally
#[derive(Debug, Clone)]
pub struct PassthroughNode {
    pub text: String,
}

/// Logical negation
#[derive(Debug, Clone)]
pub struct UnaryNode {
    pub op: UnaryOp,
    pub operand: Box<FilterNode>,
    pub(crate) state: ValidationCell<()>,
}

/// Composite boolean combination; always two or more children
#[derive(Debug, Clone)]
pub struct LogicalNode {
    pub op: LogicalOp,
    pub children: Vec<FilterNode>,
    pub(crate) state: ValidationCell<()>,
}

/// Binary comparison between two operand expressions
#[derive(Debug, Clone)]
pub struct ComparisonNode {
    pub op: ComparisonOp,
    pub left: OperandExpr,
    pub right: OperandExpr,
    pub(crate) state: ValidationCell<ComparisonState>,
}

/// Existential or universal test over a collection navigation property
#[derive(Debug, Clone)]
pub struct QuantifiedNode {
    pub op: QuantifierOp,
    pub collection: OperandExpr,
    pub body: Box<FilterNode>,
    pub(crate) state: ValidationCell<()>,
}

/// A value-valued expression under a predicate
#[derive(Debug, Clone)]
pub enum OperandExpr {
    Literal(LiteralExpr),
    Property(PropertyPathExpr),
    FunctionCall(FunctionCallExpr),
}

/// A constant value
#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: Value,
    pub data_type: Option<DataType>,
    /// Explicit tags survive serialization so the value is not reinterpreted
    /// as a property reference on round-trip
    pub has_explicit_data_type: bool,
}

/// Reference to a (possibly nested) field on the record
#[derive(Debug, Clone)]
pub struct PropertyPathExpr {
    pub path: String,
    pub(crate) state: ValidationCell<PropertyState>,
}

/// Call of a fixed-table function, bound to its entry at construction
#[derive(Debug, Clone)]
pub struct FunctionCallExpr {
    pub name: &'static str,
    pub args: Vec<OperandExpr>,
    pub(crate) entry: &'static FunctionEntry,
}

impl LiteralExpr {
    /// Create a literal, inferring the data type from the value
    pub fn new(value: Value) -> Self {
        let data_type = DataType::infer(&value);
        Self {
            value,
            data_type,
            has_explicit_data_type: false,
        }
    }

    /// Create a literal with an explicitly declared data type
    pub fn with_data_type(value: Value, data_type: DataType) -> FilterResult<Self> {
        Ok(Self {
            value: data_type.parse(&value)?,
            data_type: Some(data_type),
            has_explicit_data_type: true,
        })
    }

    /// Create a literal parsed under a contextual type hint. The hint shapes
    /// the value but is not an explicit tag.
    pub(crate) fn hinted(value: Value, data_type: DataType) -> FilterResult<Self> {
        Ok(Self {
            value: data_type.parse(&value)?,
            data_type: Some(data_type),
            has_explicit_data_type: false,
        })
    }
}

impl PropertyPathExpr {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: ValidationCell::default(),
        }
    }

    /// Data type resolved by the last validation, if any
    pub fn data_type(&self) -> Option<DataType> {
        self.state.data().data_type
    }
}

impl FunctionCallExpr {
    /// Bind a function call to its table entry. Unknown names and arity
    /// mismatches fail here, never later.
    pub fn new(name: &str, args: Vec<OperandExpr>) -> FilterResult<Self> {
        let entry = functions::lookup(name).ok_or_else(|| FilterError::UnknownFunction {
            name: name.to_string(),
        })?;
        if args.len() < entry.min_args || args.len() > entry.max_args {
            return Err(FilterError::FunctionArity {
                function: entry.name.to_string(),
                expected: if args.len() < entry.min_args {
                    entry.min_args
                } else {
                    entry.max_args
                },
                actual: args.len(),
            });
        }
        Ok(Self {
            name: entry.name,
            args,
            entry,
        })
    }

    pub fn return_type(&self) -> DataType {
        self.entry.return_type
    }
}

impl OperandExpr {
    pub fn literal(value: Value) -> OperandExpr {
        OperandExpr::Literal(LiteralExpr::new(value))
    }

    pub fn property(path: impl Into<String>) -> OperandExpr {
        OperandExpr::Property(PropertyPathExpr::new(path))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, OperandExpr::Literal(_))
    }

    /// Data type of this expression, where known
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            OperandExpr::Literal(lit) => lit.data_type,
            OperandExpr::Property(prop) => prop.data_type(),
            OperandExpr::FunctionCall(call) => Some(call.return_type()),
        }
    }
}

impl FilterNode {
    /// Wrap pre-formed filter text verbatim
    pub fn passthrough(text: impl Into<String>) -> FilterNode {
        FilterNode::Passthrough(PassthroughNode { text: text.into() })
    }

    /// Build a comparison predicate
    pub fn comparison(op: ComparisonOp, left: OperandExpr, right: OperandExpr) -> FilterNode {
        FilterNode::Comparison(ComparisonNode {
            op,
            left,
            right,
            state: ValidationCell::default(),
        })
    }

    /// Build a quantified predicate over a collection expression
    pub fn quantified(op: QuantifierOp, collection: OperandExpr, body: FilterNode) -> FilterNode {
        FilterNode::Quantified(QuantifiedNode {
            op,
            collection,
            body: Box::new(body),
            state: ValidationCell::default(),
        })
    }

    /// Negate this predicate
    pub fn not(self) -> FilterNode {
        FilterNode::Unary(UnaryNode {
            op: UnaryOp::Not,
            operand: Box::new(self),
            state: ValidationCell::default(),
        })
    }

    /// Conjoin with another predicate
    pub fn and(self, other: FilterNode) -> FilterNode {
        FilterNode::Logical(LogicalNode {
            op: LogicalOp::And,
            children: vec![self, other],
            state: ValidationCell::default(),
        })
    }

    /// Disjoin with another predicate
    pub fn or(self, other: FilterNode) -> FilterNode {
        FilterNode::Logical(LogicalNode {
            op: LogicalOp::Or,
            children: vec![self, other],
            state: ValidationCell::default(),
        })
    }

    /// Operand data type resolved by the last validation of this comparison
    pub fn operand_type(&self) -> Option<DataType> {
        match self {
            FilterNode::Comparison(node) => node.state.data().operand_type,
            _ => None,
        }
    }
}

/// Combine predicates with `and`, filtering absent inputs.
///
/// Zero resolvable predicates yield `None`; exactly one is returned unchanged
/// rather than wrapped.
pub fn and_all<I>(predicates: I) -> Option<FilterNode>
where
    I: IntoIterator<Item = Option<FilterNode>>,
{
    compose(LogicalOp::And, predicates)
}

/// Combine predicates with `or`, filtering absent inputs
pub fn or_all<I>(predicates: I) -> Option<FilterNode>
where
    I: IntoIterator<Item = Option<FilterNode>>,
{
    compose(LogicalOp::Or, predicates)
}

/// Negate a predicate, passing absent through
pub fn negate(predicate: Option<FilterNode>) -> Option<FilterNode> {
    predicate.map(FilterNode::not)
}

pub(crate) fn compose<I>(op: LogicalOp, predicates: I) -> Option<FilterNode>
where
    I: IntoIterator<Item = Option<FilterNode>>,
{
    let mut children: Vec<FilterNode> = predicates.into_iter().flatten().collect();
    match children.len() {
        0 => None,
        1 => children.pop(),
        _ => Some(FilterNode::Logical(LogicalNode {
            op,
            children,
            state: ValidationCell::default(),
        })),
    }
}
