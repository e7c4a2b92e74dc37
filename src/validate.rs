//! Schema-driven validation of filter trees.
//!
//! Validation resolves property paths, infers and propagates data types, and
//! enforces structural constraints. Results are memoized per node against the
//! identity of the schema, so backends can trigger validation freely; an
//! absent schema is never memoized and always re-runs.

use log::debug;

use crate::error::{FilterError, FilterResult};
use crate::node::{
    ComparisonNode, ComparisonState, FilterNode, LogicalNode, OperandExpr, PropertyPathExpr,
    PropertyState, QuantifiedNode, UnaryNode,
};
use crate::schema::{schema_identity, ResolvedProperty, SchemaRef};

fn identity(schema: Option<&SchemaRef>) -> Option<usize> {
    schema.map(schema_identity)
}

/// Schemas that carry property knowledge; anonymous ones behave like absent
fn concrete(schema: Option<&SchemaRef>) -> Option<&SchemaRef> {
    schema.filter(|s| !s.is_anonymous())
}

impl FilterNode {
    /// Validate this tree against an optional schema.
    ///
    /// Idempotent for a given schema; repeat calls with the same schema are
    /// no-ops.
    pub fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        match self {
            FilterNode::Passthrough(_) => Ok(()),
            FilterNode::Unary(node) => node.validate(schema),
            FilterNode::Logical(node) => node.validate(schema),
            FilterNode::Comparison(node) => node.validate(schema),
            FilterNode::Quantified(node) => node.validate(schema),
        }
    }
}

impl UnaryNode {
    fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        let id = identity(schema);
        if self.state.is_validated_for(id) {
            return Ok(());
        }
        self.operand.validate(schema)?;
        self.state.store(id, ());
        Ok(())
    }
}

impl LogicalNode {
    fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        let id = identity(schema);
        if self.state.is_validated_for(id) {
            return Ok(());
        }
        for child in &self.children {
            child.validate(schema)?;
        }
        self.state.store(id, ());
        Ok(())
    }
}

impl ComparisonNode {
    fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        let id = identity(schema);
        if self.state.is_validated_for(id) {
            return Ok(());
        }

        // A comparison's left side must denote a property or function,
        // never a constant
        if let OperandExpr::Literal(lit) = &self.left {
            return Err(FilterError::LiteralComparisonTarget {
                literal: lit.value.to_string(),
            });
        }

        self.left.validate(schema)?;
        self.right.validate(schema)?;

        let left_type = self.left.data_type();
        let operand_type = left_type.or_else(|| self.right.data_type());

        // An untyped left property picks up the right side's inferred type
        if left_type.is_none() {
            if let (OperandExpr::Property(prop), Some(data_type)) =
                (&self.left, self.right.data_type())
            {
                prop.state.store(
                    id,
                    PropertyState {
                        data_type: Some(data_type),
                        target: None,
                    },
                );
            }
        }

        self.state.store(id, ComparisonState { operand_type });
        Ok(())
    }
}

impl QuantifiedNode {
    fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        let id = identity(schema);
        if self.state.is_validated_for(id) {
            return Ok(());
        }
        self.collection.validate(schema)?;
        let element = self.element_schema(schema);
        self.body.validate(element.as_ref())?;
        self.state.store(id, ());
        Ok(())
    }

    /// Schema of the elements reached through the collection expression.
    /// Absent or anonymous outer schemas yield an absent element schema.
    pub(crate) fn element_schema(&self, schema: Option<&SchemaRef>) -> Option<SchemaRef> {
        concrete(schema)?;
        match &self.collection {
            OperandExpr::Property(prop) => prop.state.data().target,
            _ => None,
        }
    }
}

impl OperandExpr {
    pub(crate) fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        match self {
            // Literals are fully typed at construction
            OperandExpr::Literal(_) => Ok(()),
            OperandExpr::Property(prop) => prop.validate(schema),
            OperandExpr::FunctionCall(call) => {
                for arg in &call.args {
                    arg.validate(schema)?;
                }
                Ok(())
            }
        }
    }
}

impl PropertyPathExpr {
    fn validate(&self, schema: Option<&SchemaRef>) -> FilterResult<()> {
        let id = identity(schema);
        if self.state.is_validated_for(id) {
            return Ok(());
        }
        let Some(schema) = concrete(schema) else {
            // Nothing to resolve against; the path stays untyped
            return Ok(());
        };
        match schema.resolve_property(&self.path) {
            Some(ResolvedProperty::Data(data_type)) => {
                debug!(
                    "resolved '{}' on schema '{}' as {:?}",
                    self.path,
                    schema.name(),
                    data_type
                );
                self.state.store(
                    id,
                    PropertyState {
                        data_type: Some(data_type),
                        target: None,
                    },
                );
                Ok(())
            }
            Some(ResolvedProperty::Navigation(target)) => {
                self.state.store(
                    id,
                    PropertyState {
                        data_type: None,
                        target: Some(target),
                    },
                );
                Ok(())
            }
            None => Err(FilterError::UnresolvablePath {
                path: self.path.clone(),
                schema: schema.name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::normalize::normalize;
    use crate::schema::MapSchema;
    use serde_json::json;

    fn order_schema() -> SchemaRef {
        let detail = MapSchema::new("OrderDetail")
            .with_property("unitPrice", DataType::Float64)
            .into_ref();
        MapSchema::new("Order")
            .with_property("freight", DataType::Float64)
            .with_property("shipCity", DataType::String)
            .with_property("shippedDate", DataType::DateTime)
            .with_navigation("details", detail)
            .into_ref()
    }

    fn must(input: serde_json::Value) -> FilterNode {
        normalize(&input).unwrap().unwrap()
    }

    #[test]
    fn test_resolves_property_types() {
        let schema = order_schema();
        let node = must(json!({"freight": {"gt": 100}}));
        node.validate(Some(&schema)).unwrap();
        assert_eq!(node.operand_type(), Some(DataType::Float64));
    }

    #[test]
    fn test_unresolvable_path_fails() {
        let schema = order_schema();
        let node = must(json!({"cargoWeight": {"gt": 100}}));
        let err = node.validate(Some(&schema)).unwrap_err();
        match err {
            FilterError::UnresolvablePath { path, schema } => {
                assert_eq!(path, "cargoWeight");
                assert_eq!(schema, "Order");
            }
            other => panic!("expected unresolvable path, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_is_memoized() {
        let schema = order_schema();
        let node = must(json!({"freight": {"gt": 100}}));
        node.validate(Some(&schema)).unwrap();
        node.validate(Some(&schema)).unwrap();
        assert_eq!(node.operand_type(), Some(DataType::Float64));
    }

    #[test]
    fn test_schemaless_validation_is_noop() {
        let node = must(json!({"anything": {"gt": 100}}));
        node.validate(None).unwrap();
        // Type comes from the right side when the left is unresolved
        assert_eq!(node.operand_type(), Some(DataType::Int32));
    }

    #[test]
    fn test_literal_left_rejected() {
        use crate::node::OperandExpr;
        use crate::operator::ComparisonOp;

        let node = FilterNode::comparison(
            ComparisonOp::Eq,
            OperandExpr::literal(json!(1)),
            OperandExpr::literal(json!(1)),
        );
        let err = node.validate(None).unwrap_err();
        assert!(matches!(err, FilterError::LiteralComparisonTarget { .. }));
    }

    #[test]
    fn test_type_propagates_to_untyped_left() {
        let node = must(json!({"freight": {"gt": 100}}));
        node.validate(None).unwrap();
        if let FilterNode::Comparison(cmp) = &node {
            assert_eq!(cmp.left.data_type(), Some(DataType::Int32));
        } else {
            panic!("expected comparison");
        }
    }

    #[test]
    fn test_quantified_body_validates_against_element_schema() {
        let schema = order_schema();
        let node = must(json!({"details": {"any": {"unitPrice": {"gt": 5}}}}));
        node.validate(Some(&schema)).unwrap();

        // Unknown element property fails through the nested schema
        let node = must(json!({"details": {"any": {"color": {"gt": 5}}}}));
        let err = node.validate(Some(&schema)).unwrap_err();
        match err {
            FilterError::UnresolvablePath { schema, .. } => assert_eq!(schema, "OrderDetail"),
            other => panic!("expected unresolvable path, got {:?}", other),
        }
    }

    #[test]
    fn test_function_arguments_validate() {
        let schema = order_schema();
        let node = must(json!({"toupper(shipCity)": "CHICAGO"}));
        node.validate(Some(&schema)).unwrap();

        let node = must(json!({"toupper(color)": "RED"}));
        assert!(node.validate(Some(&schema)).is_err());
    }

    #[test]
    fn test_distinct_schemas_revalidate() {
        let first = order_schema();
        let second = MapSchema::new("Shipment")
            .with_property("freight", DataType::Int32)
            .into_ref();
        let node = must(json!({"freight": {"gt": 100}}));
        node.validate(Some(&first)).unwrap();
        assert_eq!(node.operand_type(), Some(DataType::Float64));
        node.validate(Some(&second)).unwrap();
        assert_eq!(node.operand_type(), Some(DataType::Int32));
    }
}
