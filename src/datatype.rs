//! Data types and the coercion bridge used by literals and the evaluator.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FilterError, FilterResult};

/// Data types a filter value can carry.
///
/// `DateTime` values travel as RFC 3339 strings inside JSON records; the type
/// tag is what tells the engine to order them as instants rather than text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Boolean,
    Int32,
    Int64,
    Float64,
    DateTime,
    Guid,
}

impl DataType {
    /// Get the display name for this data type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::DateTime => "DateTime",
            DataType::Guid => "Guid",
        }
    }

    /// Resolve a data-type name, case-insensitively
    pub fn from_name(name: &str) -> Option<DataType> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(DataType::String),
            "boolean" | "bool" => Some(DataType::Boolean),
            "int32" => Some(DataType::Int32),
            "int64" => Some(DataType::Int64),
            "float64" | "double" => Some(DataType::Float64),
            "datetime" => Some(DataType::DateTime),
            "guid" => Some(DataType::Guid),
            _ => None,
        }
    }

    /// Infer a data type from a raw JSON value.
    ///
    /// Strings always infer as `String`: JSON carries dates as strings, so a
    /// date interpretation requires an explicitly declared type. `Null` has
    /// no inherent type.
    pub fn infer(value: &Value) -> Option<DataType> {
        match value {
            Value::Bool(_) => Some(DataType::Boolean),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        Some(DataType::Int32)
                    } else {
                        Some(DataType::Int64)
                    }
                } else {
                    Some(DataType::Float64)
                }
            }
            Value::String(_) => Some(DataType::String),
            _ => None,
        }
    }

    /// Parse a raw value into this type's canonical JSON representation.
    pub fn parse(&self, raw: &Value) -> FilterResult<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let fail = || FilterError::InvalidLiteral {
            value: raw.to_string(),
            data_type: self.name(),
        };
        match self {
            DataType::String | DataType::Guid => match raw {
                Value::String(s) => Ok(Value::String(s.clone())),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                _ => Err(fail()),
            },
            DataType::Boolean => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(fail()),
                },
                _ => Err(fail()),
            },
            DataType::Int32 | DataType::Int64 => {
                let n = match raw {
                    Value::Number(n) => n
                        .as_i64()
                        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                let n = n.ok_or_else(|| fail())?;
                if *self == DataType::Int32 && (n < i32::MIN as i64 || n > i32::MAX as i64) {
                    return Err(fail());
                }
                Ok(Value::from(n))
            }
            DataType::Float64 => {
                let n = match raw {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                Ok(Value::from(n.ok_or_else(|| fail())?))
            }
            DataType::DateTime => match raw {
                Value::String(s) => {
                    DateTime::parse_from_rfc3339(s.trim()).map_err(|_| fail())?;
                    Ok(Value::String(s.trim().to_string()))
                }
                _ => Err(fail()),
            },
        }
    }
}

/// A value coerced into a totally ordered shape for relational comparison.
///
/// Values of different shapes are incomparable: the comparison simply yields
/// no ordering and the surrounding predicate evaluates false.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Time(DateTime<FixedOffset>),
}

impl Comparable {
    /// Coerce a raw value using the declared data type when one is known,
    /// falling back to the value's natural shape.
    pub fn coerce(value: &Value, data_type: Option<DataType>) -> Comparable {
        let data_type = data_type.or_else(|| DataType::infer(value));
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(b) => Comparable::Bool(*b),
            Value::Number(n) => Comparable::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => match data_type {
                Some(DataType::DateTime) => match DateTime::parse_from_rfc3339(s.trim()) {
                    Ok(t) => Comparable::Time(t),
                    Err(_) => Comparable::Text(s.clone()),
                },
                Some(DataType::Int32) | Some(DataType::Int64) | Some(DataType::Float64) => {
                    match s.trim().parse::<f64>() {
                        Ok(n) => Comparable::Number(n),
                        Err(_) => Comparable::Text(s.clone()),
                    }
                }
                Some(DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Comparable::Bool(true),
                    "false" => Comparable::Bool(false),
                    _ => Comparable::Text(s.clone()),
                },
                _ => Comparable::Text(s.clone()),
            },
            // Arrays and objects have no ordering
            _ => Comparable::Null,
        }
    }
}

impl PartialOrd for Comparable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Text(a), Comparable::Text(b)) => Some(a.cmp(b)),
            (Comparable::Time(a), Comparable::Time(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer() {
        assert_eq!(DataType::infer(&json!(true)), Some(DataType::Boolean));
        assert_eq!(DataType::infer(&json!(42)), Some(DataType::Int32));
        assert_eq!(
            DataType::infer(&json!(i64::from(i32::MAX) + 1)),
            Some(DataType::Int64)
        );
        assert_eq!(DataType::infer(&json!(1.5)), Some(DataType::Float64));
        assert_eq!(DataType::infer(&json!("hello")), Some(DataType::String));
        // Dates arrive as strings; no implicit DateTime inference
        assert_eq!(
            DataType::infer(&json!("2020-01-01T00:00:00Z")),
            Some(DataType::String)
        );
        assert_eq!(DataType::infer(&Value::Null), None);
        assert_eq!(DataType::infer(&json!([1, 2])), None);
    }

    #[test]
    fn test_names_round_trip() {
        for dt in [
            DataType::String,
            DataType::Boolean,
            DataType::Int32,
            DataType::Int64,
            DataType::Float64,
            DataType::DateTime,
            DataType::Guid,
        ] {
            assert_eq!(DataType::from_name(dt.name()), Some(dt));
            assert_eq!(DataType::from_name(&dt.name().to_lowercase()), Some(dt));
        }
        assert_eq!(DataType::from_name("Unknown"), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            DataType::Int32.parse(&json!("100")).unwrap(),
            json!(100i64)
        );
        assert_eq!(DataType::Int32.parse(&json!(100.0)).unwrap(), json!(100i64));
        assert!(DataType::Int32.parse(&json!("abc")).is_err());
        assert!(DataType::Int32.parse(&json!(1.5)).is_err());
        assert!(DataType::Int32
            .parse(&json!(i64::from(i32::MAX) + 1))
            .is_err());

        assert_eq!(DataType::Float64.parse(&json!("1.5")).unwrap(), json!(1.5));
        assert_eq!(
            DataType::Boolean.parse(&json!("True")).unwrap(),
            json!(true)
        );
        assert_eq!(
            DataType::String.parse(&json!(42)).unwrap(),
            json!("42")
        );

        assert!(DataType::DateTime
            .parse(&json!("2020-06-01T12:00:00Z"))
            .is_ok());
        assert!(DataType::DateTime.parse(&json!("yesterday")).is_err());

        // Null passes through every type
        assert_eq!(DataType::Int32.parse(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_comparable_ordering() {
        let a = Comparable::coerce(&json!(10), None);
        let b = Comparable::coerce(&json!(20), None);
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Less));

        // Declared numeric type parses numeric strings
        let a = Comparable::coerce(&json!("100"), Some(DataType::Float64));
        let b = Comparable::coerce(&json!(50), Some(DataType::Float64));
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Greater));

        // DateTime ordering follows the instant, not the text
        let a = Comparable::coerce(
            &json!("2020-01-01T00:00:00+09:00"),
            Some(DataType::DateTime),
        );
        let b = Comparable::coerce(&json!("2020-01-01T00:00:00Z"), Some(DataType::DateTime));
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Less));

        // Mixed shapes are incomparable
        let a = Comparable::coerce(&json!(10), None);
        let b = Comparable::coerce(&json!("ten"), None);
        assert_eq!(a.partial_cmp(&b), None);

        assert_eq!(
            Comparable::Null.partial_cmp(&Comparable::Null),
            Some(Ordering::Equal)
        );
    }
}
