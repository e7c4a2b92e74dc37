//! Filter-expression engine.
//!
//! This crate provides:
//! - Normalization of heterogeneous filter inputs (JSON object literals,
//!   comparison tuples, textual function-call expressions) into a canonical
//!   immutable expression tree
//! - Schema-driven validation with per-schema memoization
//! - An evaluator backend compiling trees into `record -> bool` predicates
//!   over `serde_json::Value` records
//! - A serializer backend rendering the canonical JSON interchange form

pub mod backend;
pub mod datatype;
pub mod error;
pub mod eval;
pub mod functions;
pub mod node;
pub mod normalize;
pub mod operator;
pub mod parser;
pub mod schema;
pub mod serialize;
mod validate;

pub use backend::{dispatch, BackendContext, FilterBackend};
pub use datatype::{Comparable, DataType};
pub use error::{FilterError, FilterResult};
pub use eval::{get_property, PredicateFn, ValueFn};
pub use node::{
    and_all, negate, or_all, ComparisonNode, FilterNode, FunctionCallExpr, LiteralExpr,
    LogicalNode, OperandExpr, PassthroughNode, PropertyPathExpr, QuantifiedNode, UnaryNode,
};
pub use normalize::normalize;
pub use operator::{ComparisonOp, LogicalOp, OperatorRegistry, QuantifierOp, UnaryOp};
pub use parser::{parse_expression, ParseContext};
pub use schema::{
    AnonymousSchema, EntitySchema, MapSchema, PropertyDef, ResolvedProperty, SchemaRef,
    StringCompareOptions,
};
pub use serialize::SerializeOptions;
