//! Backend dispatch over filter trees.
//!
//! A backend is one traversal purpose realized as a handler per node kind.
//! Dispatch validates the node against the context's schema before invoking
//! the handler, so every backend sees a validated tree without re-deriving
//! validation logic.

use crate::error::FilterResult;
use crate::node::{
    ComparisonNode, FilterNode, LogicalNode, PassthroughNode, QuantifiedNode, UnaryNode,
};
use crate::schema::SchemaRef;

/// Context handed to backend handlers; always carries the (possibly absent)
/// schema.
#[derive(Clone, Default)]
pub struct BackendContext {
    pub schema: Option<SchemaRef>,
}

impl BackendContext {
    pub fn new(schema: Option<&SchemaRef>) -> Self {
        Self {
            schema: schema.cloned(),
        }
    }

    /// Context for a quantifier body, under the element schema
    pub(crate) fn element(&self, schema: Option<SchemaRef>) -> Self {
        Self { schema }
    }
}

impl From<SchemaRef> for BackendContext {
    fn from(schema: SchemaRef) -> Self {
        Self {
            schema: Some(schema),
        }
    }
}

/// One handler per node kind
pub trait FilterBackend {
    type Output;

    fn passthrough(
        &self,
        node: &PassthroughNode,
        ctx: &BackendContext,
    ) -> FilterResult<Self::Output>;
    fn unary(&self, node: &UnaryNode, ctx: &BackendContext) -> FilterResult<Self::Output>;
    fn logical(&self, node: &LogicalNode, ctx: &BackendContext) -> FilterResult<Self::Output>;
    fn comparison(&self, node: &ComparisonNode, ctx: &BackendContext)
        -> FilterResult<Self::Output>;
    fn quantified(&self, node: &QuantifiedNode, ctx: &BackendContext)
        -> FilterResult<Self::Output>;
}

/// Validate `node` against the context's schema, then hand it to the backend
pub fn dispatch<B: FilterBackend>(
    backend: &B,
    node: &FilterNode,
    ctx: &BackendContext,
) -> FilterResult<B::Output> {
    node.validate(ctx.schema.as_ref())?;
    match node {
        FilterNode::Passthrough(n) => backend.passthrough(n, ctx),
        FilterNode::Unary(n) => backend.unary(n, ctx),
        FilterNode::Logical(n) => backend.logical(n, ctx),
        FilterNode::Comparison(n) => backend.comparison(n, ctx),
        FilterNode::Quantified(n) => backend.quantified(n, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::normalize::normalize;
    use serde_json::json;

    /// Counts node kinds; exists to exercise dispatch in isolation
    struct KindName;

    impl FilterBackend for KindName {
        type Output = &'static str;

        fn passthrough(&self, _: &PassthroughNode, _: &BackendContext) -> FilterResult<&'static str> {
            Ok("passthrough")
        }
        fn unary(&self, _: &UnaryNode, _: &BackendContext) -> FilterResult<&'static str> {
            Ok("unary")
        }
        fn logical(&self, _: &LogicalNode, _: &BackendContext) -> FilterResult<&'static str> {
            Ok("logical")
        }
        fn comparison(&self, _: &ComparisonNode, _: &BackendContext) -> FilterResult<&'static str> {
            Ok("comparison")
        }
        fn quantified(&self, _: &QuantifiedNode, _: &BackendContext) -> FilterResult<&'static str> {
            Ok("quantified")
        }
    }

    #[test]
    fn test_dispatch_by_kind() {
        let ctx = BackendContext::default();
        let node = normalize(&json!({"freight": {"gt": 10}})).unwrap().unwrap();
        assert_eq!(dispatch(&KindName, &node, &ctx).unwrap(), "comparison");

        let node = normalize(&json!({"not": {"freight": {"gt": 10}}}))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch(&KindName, &node, &ctx).unwrap(), "unary");
    }

    #[test]
    fn test_dispatch_validates_first() {
        use crate::node::OperandExpr;
        use crate::operator::ComparisonOp;

        let ctx = BackendContext::default();
        let node = FilterNode::comparison(
            ComparisonOp::Eq,
            OperandExpr::literal(json!(1)),
            OperandExpr::literal(json!(2)),
        );
        let err = dispatch(&KindName, &node, &ctx).unwrap_err();
        assert!(matches!(err, FilterError::LiteralComparisonTarget { .. }));
    }
}
