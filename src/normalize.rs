//! Normalization of heterogeneous filter inputs into canonical trees.
//!
//! The single entry point accepts a JSON object literal, a 3- or 5-element
//! comparison tuple, or a passthrough string, and produces a canonical
//! `FilterNode`. An existing node is already canonical and needs no entry
//! point at all.

use log::debug;
use serde_json::{Map, Value};

use crate::datatype::DataType;
use crate::error::{FilterError, FilterResult};
use crate::node::{and_all, compose, FilterNode, LiteralExpr, OperandExpr, PropertyPathExpr};
use crate::operator::{ComparisonOp, LogicalOp, OperatorRegistry};
use crate::parser::{parse_expression, ParseContext};

impl FilterNode {
    /// Normalize any supported input shape into a canonical tree.
    ///
    /// Returns `Ok(None)` for inputs that resolve to no predicate at all
    /// (`null`, an empty object, an empty `and`/`or`).
    pub fn normalize(input: &Value) -> FilterResult<Option<FilterNode>> {
        normalize(input)
    }

    /// Call-form equivalent of the `[path, operator, value]` tuple
    pub fn compare(left: &str, op_token: &str, value: &Value) -> FilterResult<FilterNode> {
        comparison_from_parts(left, op_token, value)
    }
}

/// Normalize any supported input shape into a canonical tree
pub fn normalize(input: &Value) -> FilterResult<Option<FilterNode>> {
    match input {
        Value::Null => Ok(None),
        // Pre-formed filter text is wrapped verbatim, never parsed
        Value::String(text) => Ok(Some(FilterNode::passthrough(text.clone()))),
        Value::Array(items) => normalize_tuple(items),
        Value::Object(map) => normalize_object(map),
        other => Err(FilterError::MalformedInput(format!(
            "cannot build a filter from {}",
            other
        ))),
    }
}

fn normalize_tuple(items: &[Value]) -> FilterResult<Option<FilterNode>> {
    match items.len() {
        1 => normalize(&items[0]),
        3 => {
            let left = tuple_text(&items[0])?;
            let op = tuple_text(&items[1])?;
            Ok(Some(comparison_from_parts(left, op, &items[2])?))
        }
        5 => {
            // [path, any|all, path2, operator, value] folds the tail into a
            // nested tuple under a quantifier
            let path = tuple_text(&items[0])?;
            let quantifier = OperatorRegistry::global().quantifier(tuple_text(&items[1])?)?;
            let body = normalize_tuple(&items[2..])?.ok_or_else(|| {
                FilterError::MalformedInput(format!(
                    "quantifier '{}' over '{}' has no predicate body",
                    quantifier.key(),
                    path
                ))
            })?;
            Ok(Some(FilterNode::quantified(
                quantifier,
                lhs_operand(path)?,
                body,
            )))
        }
        len => Err(FilterError::MalformedInput(format!(
            "cannot interpret a {}-element filter tuple",
            len
        ))),
    }
}

fn tuple_text(value: &Value) -> FilterResult<&str> {
    value.as_str().ok_or_else(|| {
        FilterError::MalformedInput(format!("expected a string tuple element, got {}", value))
    })
}

fn comparison_from_parts(left: &str, op_token: &str, value: &Value) -> FilterResult<FilterNode> {
    let registry = OperatorRegistry::global();
    if let Some(quantifier) = registry.try_quantifier(op_token) {
        let body = normalize(value)?.ok_or_else(|| {
            FilterError::MalformedInput(format!(
                "quantifier '{}' over '{}' has no predicate body",
                quantifier.key(),
                left
            ))
        })?;
        return Ok(FilterNode::quantified(quantifier, lhs_operand(left)?, body));
    }
    let op = registry.comparison(op_token)?;
    Ok(FilterNode::comparison(
        op,
        lhs_operand(left)?,
        rhs_operand(value)?,
    ))
}

fn normalize_object(map: &Map<String, Value>) -> FilterResult<Option<FilterNode>> {
    let mut predicates = Vec::with_capacity(map.len());
    for (key, value) in map {
        predicates.push(node_from_entry(key, value)?);
    }
    // Multiple top-level keys combine into a single conjunction
    Ok(and_all(predicates))
}

fn node_from_entry(key: &str, value: &Value) -> FilterResult<Option<FilterNode>> {
    let registry = OperatorRegistry::global();
    if let Some(op) = registry.try_logical(key) {
        return normalize_logical(op, value);
    }
    if registry.try_unary(key).is_some() {
        let operand = normalize(value)?.ok_or_else(|| {
            FilterError::MalformedInput(format!("nothing to negate under '{}'", key))
        })?;
        return Ok(Some(operand.not()));
    }
    node_from_phrase(key, value)
}

fn normalize_logical(op: LogicalOp, value: &Value) -> FilterResult<Option<FilterNode>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => {
            // A single nested array argument is flattened
            match items.as_slice() {
                [Value::Array(inner)] if !matches!(inner.len(), 1 | 3 | 5) => {
                    inner.iter().collect()
                }
                _ => items.iter().collect(),
            }
        }
        Value::Object(_) => vec![value],
        other => {
            return Err(FilterError::MalformedInput(format!(
                "'{}' expects an array of predicates, got {}",
                op.key(),
                other
            )))
        }
    };
    let mut children = Vec::with_capacity(items.len());
    for item in items {
        children.push(normalize(item)?);
    }
    debug!(
        "composed '{}' over {} child predicates",
        op.key(),
        children.len()
    );
    Ok(compose(op, children))
}

fn node_from_phrase(key: &str, value: &Value) -> FilterResult<Option<FilterNode>> {
    match value {
        Value::Array(_) => Err(FilterError::MalformedInput(format!(
            "unable to resolve predicate after phrase: {}",
            key
        ))),
        Value::Object(map) if !map.contains_key("value") => {
            // An operator map: each key produces one node, combined with and
            let mut predicates = Vec::with_capacity(map.len());
            for (op_token, operand_value) in map {
                predicates.push(Some(operator_entry(key, op_token, operand_value)?));
            }
            Ok(and_all(predicates))
        }
        // Scalars and explicit wrappers are implicit equality
        _ => Ok(Some(FilterNode::comparison(
            ComparisonOp::Eq,
            lhs_operand(key)?,
            rhs_operand(value)?,
        ))),
    }
}

fn operator_entry(path: &str, op_token: &str, value: &Value) -> FilterResult<FilterNode> {
    let registry = OperatorRegistry::global();
    if let Some(quantifier) = registry.try_quantifier(op_token) {
        let body = normalize(value)?.ok_or_else(|| {
            FilterError::MalformedInput(format!(
                "quantifier '{}' over '{}' has no predicate body",
                quantifier.key(),
                path
            ))
        })?;
        return Ok(FilterNode::quantified(quantifier, lhs_operand(path)?, body));
    }
    let op = registry.comparison(op_token)?;
    Ok(FilterNode::comparison(
        op,
        lhs_operand(path)?,
        rhs_operand(value)?,
    ))
}

/// Resolve a left-side phrase: a property path or function-call text.
fn lhs_operand(text: &str) -> FilterResult<OperandExpr> {
    parse_expression(text, &ParseContext::lhs(None))?.ok_or_else(|| {
        FilterError::MalformedInput(format!("unable to resolve expression: {}", text))
    })
}

/// Resolve a right-side value: a literal, an explicit wrapper, a property
/// wrapper, or function-call text.
fn rhs_operand(value: &Value) -> FilterResult<OperandExpr> {
    match value {
        Value::Object(map) if map.contains_key("value") => wrapped_operand(map),
        Value::String(text) => {
            match parse_expression(text, &ParseContext::rhs(None, None))? {
                Some(expr) => Ok(expr),
                // Malformed call syntax falls back to the raw string literal
                None => Ok(OperandExpr::Literal(LiteralExpr::new(value.clone()))),
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            Ok(OperandExpr::Literal(LiteralExpr::new(value.clone())))
        }
        other => Err(FilterError::MalformedInput(format!(
            "cannot use {} as a comparison value",
            other
        ))),
    }
}

fn wrapped_operand(map: &Map<String, Value>) -> FilterResult<OperandExpr> {
    let raw = map.get("value").cloned().unwrap_or(Value::Null);
    if map.get("isProperty") == Some(&Value::Bool(true)) {
        let path = raw.as_str().ok_or_else(|| {
            FilterError::MalformedInput(format!("property reference must be a string, got {}", raw))
        })?;
        return Ok(OperandExpr::Property(PropertyPathExpr::new(path)));
    }
    match map.get("dataType") {
        Some(Value::String(name)) => {
            let data_type = DataType::from_name(name).ok_or_else(|| {
                FilterError::MalformedInput(format!("unknown data type name: {}", name))
            })?;
            Ok(OperandExpr::Literal(LiteralExpr::with_data_type(
                raw, data_type,
            )?))
        }
        _ => Ok(OperandExpr::Literal(LiteralExpr::new(raw))),
    }
}
