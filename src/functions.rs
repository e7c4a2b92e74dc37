//! The fixed table of functions usable in textual filter expressions.
//!
//! Every entry carries its declared return type and a local evaluation
//! implementation over raw JSON values. Unknown names are construction-time
//! failures in the caller; inapplicable argument values yield `None` and the
//! evaluator surfaces that as `Null` rather than an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde_json::Value;

use crate::datatype::DataType;

/// One entry of the function table
#[derive(Debug)]
pub struct FunctionEntry {
    pub name: &'static str,
    pub return_type: DataType,
    pub min_args: usize,
    pub max_args: usize,
    pub apply: fn(&[Value]) -> Option<Value>,
}

/// Look up a function by name, case-insensitively
pub fn lookup(name: &str) -> Option<&'static FunctionEntry> {
    index().get(name.trim().to_ascii_lowercase().as_str()).copied()
}

fn index() -> &'static HashMap<&'static str, &'static FunctionEntry> {
    static INDEX: OnceLock<HashMap<&'static str, &'static FunctionEntry>> = OnceLock::new();
    INDEX.get_or_init(|| TABLE.iter().map(|entry| (entry.name, entry)).collect())
}

static TABLE: &[FunctionEntry] = &[
    FunctionEntry { name: "toupper", return_type: DataType::String, min_args: 1, max_args: 1, apply: fn_toupper },
    FunctionEntry { name: "tolower", return_type: DataType::String, min_args: 1, max_args: 1, apply: fn_tolower },
    FunctionEntry { name: "substring", return_type: DataType::String, min_args: 2, max_args: 3, apply: fn_substring },
    FunctionEntry { name: "substringof", return_type: DataType::Boolean, min_args: 2, max_args: 2, apply: fn_substringof },
    FunctionEntry { name: "length", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_length },
    FunctionEntry { name: "trim", return_type: DataType::String, min_args: 1, max_args: 1, apply: fn_trim },
    FunctionEntry { name: "concat", return_type: DataType::String, min_args: 2, max_args: 2, apply: fn_concat },
    FunctionEntry { name: "replace", return_type: DataType::String, min_args: 3, max_args: 3, apply: fn_replace },
    FunctionEntry { name: "startswith", return_type: DataType::Boolean, min_args: 2, max_args: 2, apply: fn_startswith },
    FunctionEntry { name: "endswith", return_type: DataType::Boolean, min_args: 2, max_args: 2, apply: fn_endswith },
    FunctionEntry { name: "indexof", return_type: DataType::Int32, min_args: 2, max_args: 2, apply: fn_indexof },
    FunctionEntry { name: "round", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_round },
    FunctionEntry { name: "ceiling", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_ceiling },
    FunctionEntry { name: "floor", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_floor },
    FunctionEntry { name: "second", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_second },
    FunctionEntry { name: "minute", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_minute },
    FunctionEntry { name: "hour", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_hour },
    FunctionEntry { name: "day", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_day },
    FunctionEntry { name: "month", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_month },
    FunctionEntry { name: "year", return_type: DataType::Int32, min_args: 1, max_args: 1, apply: fn_year },
];

fn text(value: &Value) -> Option<&str> {
    value.as_str()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.as_str()?.trim()).ok()
}

fn fn_toupper(args: &[Value]) -> Option<Value> {
    Some(Value::String(text(args.first()?)?.to_uppercase()))
}

fn fn_tolower(args: &[Value]) -> Option<Value> {
    Some(Value::String(text(args.first()?)?.to_lowercase()))
}

fn fn_substring(args: &[Value]) -> Option<Value> {
    let source = text(args.first()?)?;
    let start = int(args.get(1)?)?.max(0) as usize;
    let chars = source.chars().skip(start);
    let result: String = match args.get(2) {
        Some(len) => chars.take(int(len)?.max(0) as usize).collect(),
        None => chars.collect(),
    };
    Some(Value::String(result))
}

fn fn_substringof(args: &[Value]) -> Option<Value> {
    let needle = text(args.first()?)?;
    let haystack = text(args.get(1)?)?;
    Some(Value::Bool(haystack.contains(needle)))
}

fn fn_length(args: &[Value]) -> Option<Value> {
    Some(Value::from(text(args.first()?)?.chars().count() as i64))
}

fn fn_trim(args: &[Value]) -> Option<Value> {
    Some(Value::String(text(args.first()?)?.trim().to_string()))
}

fn fn_concat(args: &[Value]) -> Option<Value> {
    let a = text(args.first()?)?;
    let b = text(args.get(1)?)?;
    Some(Value::String(format!("{}{}", a, b)))
}

fn fn_replace(args: &[Value]) -> Option<Value> {
    let source = text(args.first()?)?;
    let find = text(args.get(1)?)?;
    let replacement = text(args.get(2)?)?;
    Some(Value::String(source.replace(find, replacement)))
}

fn fn_startswith(args: &[Value]) -> Option<Value> {
    let source = text(args.first()?)?;
    let prefix = text(args.get(1)?)?;
    Some(Value::Bool(source.starts_with(prefix)))
}

fn fn_endswith(args: &[Value]) -> Option<Value> {
    let source = text(args.first()?)?;
    let suffix = text(args.get(1)?)?;
    Some(Value::Bool(source.ends_with(suffix)))
}

fn fn_indexof(args: &[Value]) -> Option<Value> {
    let source = text(args.first()?)?;
    let fragment = text(args.get(1)?)?;
    let index = match source.find(fragment) {
        // find yields a byte offset; report the character position
        Some(byte_index) => source[..byte_index].chars().count() as i64,
        None => -1,
    };
    Some(Value::from(index))
}

fn fn_round(args: &[Value]) -> Option<Value> {
    Some(Value::from(number(args.first()?)?.round() as i64))
}

fn fn_ceiling(args: &[Value]) -> Option<Value> {
    Some(Value::from(number(args.first()?)?.ceil() as i64))
}

fn fn_floor(args: &[Value]) -> Option<Value> {
    Some(Value::from(number(args.first()?)?.floor() as i64))
}

fn fn_second(args: &[Value]) -> Option<Value> {
    Some(Value::from(datetime(args.first()?)?.second() as i64))
}

fn fn_minute(args: &[Value]) -> Option<Value> {
    Some(Value::from(datetime(args.first()?)?.minute() as i64))
}

fn fn_hour(args: &[Value]) -> Option<Value> {
    Some(Value::from(datetime(args.first()?)?.hour() as i64))
}

fn fn_day(args: &[Value]) -> Option<Value> {
    Some(Value::from(datetime(args.first()?)?.day() as i64))
}

fn fn_month(args: &[Value]) -> Option<Value> {
    // chrono months are already 1-based
    Some(Value::from(datetime(args.first()?)?.month() as i64))
}

fn fn_year(args: &[Value]) -> Option<Value> {
    Some(Value::from(datetime(args.first()?)?.year() as i64))
}
