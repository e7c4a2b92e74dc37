//! Evaluator backend: compiles a validated tree into record predicates.
//!
//! Compilation composes closures bottom-up; the resulting predicate owns no
//! global state and is safe to call from any thread. Runtime coercion
//! failures surface as absent values and falsy comparisons, never as errors.

use std::cmp::Ordering;

use serde_json::Value;

use crate::backend::{dispatch, BackendContext, FilterBackend};
use crate::datatype::{Comparable, DataType};
use crate::error::{FilterError, FilterResult};
use crate::node::{
    ComparisonNode, FilterNode, LogicalNode, OperandExpr, PassthroughNode, QuantifiedNode,
    UnaryNode,
};
use crate::operator::{ComparisonOp, LogicalOp, QuantifierOp, UnaryOp};
use crate::schema::{SchemaRef, StringCompareOptions};

/// Compiled boolean predicate over a record
pub type PredicateFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Compiled value expression over a record
pub type ValueFn = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// Record accessor: read one property off a record
pub fn get_property<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    record.as_object()?.get(name)
}

impl FilterNode {
    /// Compile this tree into a `record -> bool` predicate
    pub fn compile(&self, schema: Option<&SchemaRef>) -> FilterResult<PredicateFn> {
        dispatch(&EvaluatorBackend, self, &BackendContext::new(schema))
    }
}

struct EvaluatorBackend;

impl FilterBackend for EvaluatorBackend {
    type Output = PredicateFn;

    fn passthrough(&self, node: &PassthroughNode, _: &BackendContext) -> FilterResult<PredicateFn> {
        Err(FilterError::CannotEvaluate {
            text: node.text.clone(),
        })
    }

    fn unary(&self, node: &UnaryNode, ctx: &BackendContext) -> FilterResult<PredicateFn> {
        let inner = dispatch(self, &node.operand, ctx)?;
        match node.op {
            UnaryOp::Not => Ok(Box::new(move |record| !inner(record))),
        }
    }

    fn logical(&self, node: &LogicalNode, ctx: &BackendContext) -> FilterResult<PredicateFn> {
        let children: Vec<PredicateFn> = node
            .children
            .iter()
            .map(|child| dispatch(self, child, ctx))
            .collect::<FilterResult<_>>()?;
        match node.op {
            LogicalOp::And => Ok(Box::new(move |record| {
                children.iter().all(|child| child(record))
            })),
            LogicalOp::Or => Ok(Box::new(move |record| {
                children.iter().any(|child| child(record))
            })),
        }
    }

    fn comparison(&self, node: &ComparisonNode, ctx: &BackendContext) -> FilterResult<PredicateFn> {
        let left = compile_operand(&node.left, ctx)?;
        let right = compile_operand(&node.right, ctx)?;
        let data_type = node.state.data().operand_type;
        let options = ctx
            .schema
            .as_ref()
            .map(|s| s.string_options())
            .unwrap_or_default();
        let op = node.op;

        match op {
            ComparisonOp::Eq | ComparisonOp::Ne => Ok(Box::new(move |record| {
                let equal = values_equal(&left(record), &right(record), data_type, options);
                if op == ComparisonOp::Eq {
                    equal
                } else {
                    !equal
                }
            })),
            ComparisonOp::Lt | ComparisonOp::Le | ComparisonOp::Gt | ComparisonOp::Ge => {
                Ok(Box::new(move |record| {
                    let lhs = Comparable::coerce(&left(record), data_type);
                    let rhs = Comparable::coerce(&right(record), data_type);
                    match lhs.partial_cmp(&rhs) {
                        Some(ordering) => match op {
                            ComparisonOp::Lt => ordering == Ordering::Less,
                            ComparisonOp::Le => ordering != Ordering::Greater,
                            ComparisonOp::Gt => ordering == Ordering::Greater,
                            ComparisonOp::Ge => ordering != Ordering::Less,
                            _ => false,
                        },
                        None => false,
                    }
                }))
            }
            ComparisonOp::StartsWith | ComparisonOp::EndsWith | ComparisonOp::Contains => {
                Ok(Box::new(move |record| {
                    fragment_match(op, &left(record), &right(record), options)
                }))
            }
        }
    }

    fn quantified(&self, node: &QuantifiedNode, ctx: &BackendContext) -> FilterResult<PredicateFn> {
        let collection = compile_operand(&node.collection, ctx)?;
        let body_ctx = ctx.element(node.element_schema(ctx.schema.as_ref()));
        let body = dispatch(self, &node.body, &body_ctx)?;
        let op = node.op;
        Ok(Box::new(move |record| {
            let value = collection(record);
            let items: &[Value] = match &value {
                Value::Array(items) => items,
                _ => &[],
            };
            match op {
                QuantifierOp::Any => items.iter().any(|item| body(item)),
                QuantifierOp::All => items.iter().all(|item| body(item)),
            }
        }))
    }
}

fn compile_operand(expr: &OperandExpr, ctx: &BackendContext) -> FilterResult<ValueFn> {
    match expr {
        OperandExpr::Literal(lit) => {
            let value = lit.value.clone();
            Ok(Box::new(move |_| value.clone()))
        }
        OperandExpr::Property(prop) => {
            let segments: Vec<String> = prop.path.split('.').map(str::to_string).collect();
            if segments.len() == 1 {
                let name = prop.path.clone();
                Ok(Box::new(move |record| {
                    get_property(record, &name).cloned().unwrap_or(Value::Null)
                }))
            } else {
                Ok(Box::new(move |record| {
                    let mut current = record;
                    for segment in &segments {
                        match get_property(current, segment) {
                            Some(value) => current = value,
                            None => return Value::Null,
                        }
                    }
                    current.clone()
                }))
            }
        }
        OperandExpr::FunctionCall(call) => {
            let args: Vec<ValueFn> = call
                .args
                .iter()
                .map(|arg| compile_operand(arg, ctx))
                .collect::<FilterResult<_>>()?;
            let apply = call.entry.apply;
            Ok(Box::new(move |record| {
                let values: Vec<Value> = args.iter().map(|arg| arg(record)).collect();
                apply(&values).unwrap_or(Value::Null)
            }))
        }
    }
}

fn values_equal(
    left: &Value,
    right: &Value,
    data_type: Option<DataType>,
    options: StringCompareOptions,
) -> bool {
    if left.is_null() || right.is_null() {
        return left.is_null() && right.is_null();
    }
    let stringy = data_type == Some(DataType::String)
        || (data_type.is_none() && left.is_string() && right.is_string());
    if stringy {
        match (left.as_str(), right.as_str()) {
            (Some(a), Some(b)) => string_equal(a, b, options),
            _ => false,
        }
    } else {
        let lhs = Comparable::coerce(left, data_type);
        let rhs = Comparable::coerce(right, data_type);
        lhs.partial_cmp(&rhs) == Some(Ordering::Equal)
    }
}

fn string_equal(a: &str, b: &str, options: StringCompareOptions) -> bool {
    let (a, b) = if options.trim_before_compare {
        (a.trim_end(), b.trim_end())
    } else {
        (a, b)
    };
    if options.case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

/// Fragment operators honor the case policy regardless of declared type
fn fragment_match(
    op: ComparisonOp,
    left: &Value,
    right: &Value,
    options: StringCompareOptions,
) -> bool {
    let (Some(source), Some(fragment)) = (left.as_str(), right.as_str()) else {
        return false;
    };
    let (source, fragment) = if options.case_sensitive {
        (source.to_string(), fragment.to_string())
    } else {
        (source.to_lowercase(), fragment.to_lowercase())
    };
    match op {
        ComparisonOp::StartsWith => source.starts_with(&fragment),
        ComparisonOp::EndsWith => source.ends_with(&fragment),
        ComparisonOp::Contains => source.contains(&fragment),
        _ => false,
    }
}
