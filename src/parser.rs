//! Parser for textual function-call filter expressions.
//!
//! The grammar is deliberately tiny: nested function calls over property
//! paths and literals, e.g. `toupper(substring(companyName,1,2))`. Instead of
//! a full recursive grammar, innermost parenthesized groups are repeatedly
//! replaced with placeholder tokens until the text is linear, then the pieces
//! are reassembled recursively.

use std::sync::OnceLock;

use log::trace;
use regex::Regex;
use serde_json::Value;

use crate::datatype::DataType;
use crate::error::FilterResult;
use crate::functions;
use crate::node::{FunctionCallExpr, LiteralExpr, OperandExpr, PropertyPathExpr};
use crate::schema::SchemaRef;

/// Placeholder delimiter for reduced groups. Outside the printable range, so
/// it cannot collide with expression text.
const DELIM: char = '\u{1}';

/// Context threaded through a parse.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    /// Schema used to recognize property paths in bare tokens
    pub schema: Option<&'a SchemaRef>,
    /// Whether this text sits on the right side of a comparison
    pub is_rhs: bool,
    /// Data-type hint for literal parsing
    pub data_type: Option<DataType>,
    in_argument: bool,
}

impl<'a> ParseContext<'a> {
    /// Context for the left side of a comparison
    pub fn lhs(schema: Option<&'a SchemaRef>) -> Self {
        Self {
            schema,
            is_rhs: false,
            data_type: None,
            in_argument: false,
        }
    }

    /// Context for the right side of a comparison
    pub fn rhs(schema: Option<&'a SchemaRef>, data_type: Option<DataType>) -> Self {
        Self {
            schema,
            is_rhs: true,
            data_type,
            in_argument: false,
        }
    }

    /// Function arguments drop the outer type hint so the `1` and `2` in
    /// `substring(companyName,1,2)` are not coerced to the comparison's
    /// target type.
    fn argument(&self) -> Self {
        Self {
            data_type: None,
            in_argument: true,
            ..*self
        }
    }
}

fn paren_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"\(([^()]*)\)").expect("valid regex"))
}

fn single_quote_args_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"\s*('[^']*'|[^,]+)").expect("valid regex"))
}

fn double_quote_args_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r#"\s*("[^"]*"|[^,]+)"#).expect("valid regex"))
}

fn identifier_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"(?i)^[a-z_][\w.$]*$").expect("valid regex"))
}

/// Parse a textual expression into an operand.
///
/// Returns `Ok(None)` when the text cannot be resolved (malformed call
/// syntax, unknown function name); the caller decides whether that is a
/// construction error or a literal fallback.
pub fn parse_expression(source: &str, ctx: &ParseContext) -> FilterResult<Option<OperandExpr>> {
    let mut text = source.trim().to_string();
    if text.is_empty() {
        return Ok(None);
    }

    // Reduce innermost parenthesized groups to placeholders until the text
    // is paren-free
    let mut groups: Vec<String> = Vec::new();
    while let Some(caps) = paren_rx().captures(&text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let inner = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let placeholder = format!("{}{}", DELIM, groups.len());
        trace!("reduced group '{}' to placeholder {}", inner, groups.len());
        groups.push(inner);
        text.replace_range(whole, &placeholder);
    }

    parse_token(&text, &groups, ctx)
}

fn parse_token(
    text: &str,
    groups: &[String],
    ctx: &ParseContext,
) -> FilterResult<Option<OperandExpr>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let Some(pos) = text.find(DELIM) else {
        return resolve_bare_token(text, ctx);
    };

    // Text before the placeholder is the function name; the recorded group
    // is its argument list
    let name = text[..pos].trim();
    let index_text = &text[pos + DELIM.len_utf8()..];
    if name.is_empty() || index_text.is_empty() || !index_text.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let Ok(index) = index_text.parse::<usize>() else {
        return Ok(None);
    };
    let Some(arg_source) = groups.get(index) else {
        return Ok(None);
    };
    if functions::lookup(name).is_none() {
        return Ok(None);
    }

    let arg_ctx = ctx.argument();
    let mut args = Vec::new();
    for arg_text in split_arguments(arg_source) {
        match parse_token(&arg_text, groups, &arg_ctx)? {
            Some(arg) => args.push(arg),
            None => return Ok(None),
        }
    }

    Ok(Some(OperandExpr::FunctionCall(FunctionCallExpr::new(
        name, args,
    )?)))
}

/// Split an argument list on commas that are not inside quoted substrings.
/// The alternate regex is chosen by whether the source contains a single
/// quote, to avoid ambiguity with quoted commas.
fn split_arguments(source: &str) -> Vec<String> {
    let rx = if source.contains('\'') {
        single_quote_args_rx()
    } else {
        double_quote_args_rx()
    };
    rx.captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

fn resolve_bare_token(token: &str, ctx: &ParseContext) -> FilterResult<Option<OperandExpr>> {
    // A matching pair of leading/trailing quote characters denotes a string
    // literal
    let first = token.chars().next();
    if let Some(quote @ ('\'' | '"')) = first {
        if token.len() > 1 && token.ends_with(quote) {
            let unquoted = &token[1..token.len() - 1];
            return Ok(Some(OperandExpr::Literal(LiteralExpr::new(Value::String(
                unquoted.to_string(),
            )))));
        }
    }

    if let Some(schema) = ctx.schema.filter(|s| !s.is_anonymous()) {
        if identifier_rx().is_match(token) && schema.resolve_property(token).is_some() {
            return Ok(Some(OperandExpr::Property(PropertyPathExpr::new(token))));
        }
        return Ok(Some(literal_from_text(token, ctx)?));
    }

    // Without a schema there is nothing to confirm a path against: the right
    // side of a comparison is a literal, the left side a property reference.
    // Function arguments keep self-evident literals (numbers, booleans) so
    // calls like substring(name,1,2) still work.
    if ctx.is_rhs || (ctx.in_argument && is_self_evident_literal(token)) {
        return Ok(Some(literal_from_text(token, ctx)?));
    }
    Ok(Some(OperandExpr::Property(PropertyPathExpr::new(token))))
}

fn is_self_evident_literal(token: &str) -> bool {
    matches!(token.to_ascii_lowercase().as_str(), "true" | "false")
        || token.parse::<f64>().is_ok()
}

fn literal_from_text(token: &str, ctx: &ParseContext) -> FilterResult<OperandExpr> {
    if let Some(data_type) = ctx.data_type {
        let lit = LiteralExpr::hinted(Value::String(token.to_string()), data_type)?;
        return Ok(OperandExpr::Literal(lit));
    }
    let value = match token.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(i) = token.parse::<i64>() {
                Value::from(i)
            } else if let Ok(f) = token.parse::<f64>() {
                Value::from(f)
            } else {
                Value::String(token.to_string())
            }
        }
    };
    Ok(OperandExpr::Literal(LiteralExpr::new(value)))
}
