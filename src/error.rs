//! Error types for filter construction, validation, and evaluation.

use thiserror::Error;

/// Errors raised by the filter engine.
///
/// All failures are synchronous and fatal to the call that produced them;
/// callers decide whether to catch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// An operator token could not be resolved against the alias table of its
    /// node kind.
    #[error("unresolvable {kind} operator: '{token}'")]
    UnresolvableOperator { kind: &'static str, token: String },

    /// A textual expression named a function outside the fixed table.
    #[error("unknown filter function: '{name}'")]
    UnknownFunction { name: String },

    /// A function call carried the wrong number of arguments.
    #[error("function '{function}' expects {expected} arguments, got {actual}")]
    FunctionArity {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// Structurally invalid input at the normalization entry point.
    #[error("malformed filter input: {0}")]
    MalformedInput(String),

    /// A property path did not resolve against a concrete schema.
    #[error("unable to resolve property path '{path}' on schema '{schema}'")]
    UnresolvablePath { path: String, schema: String },

    /// The left side of a comparison resolved to a constant.
    #[error("the left side of a comparison must denote a property or function, not the literal {literal}")]
    LiteralComparisonTarget { literal: String },

    /// A raw value could not be parsed as the declared data type.
    #[error("cannot parse {value} as {data_type}")]
    InvalidLiteral {
        value: String,
        data_type: &'static str,
    },

    /// A passthrough node was handed to the evaluator backend.
    #[error("passthrough filter text cannot be evaluated locally: {text}")]
    CannotEvaluate { text: String },
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FilterError::UnresolvableOperator {
            kind: "comparison",
            token: "betwixt".to_string(),
        };
        assert_eq!(err.to_string(), "unresolvable comparison operator: 'betwixt'");

        let err = FilterError::UnknownFunction {
            name: "frobnicate".to_string(),
        };
        assert_eq!(err.to_string(), "unknown filter function: 'frobnicate'");

        let err = FilterError::FunctionArity {
            function: "substring".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "function 'substring' expects 2 arguments, got 1"
        );

        let err = FilterError::UnresolvablePath {
            path: "shipCity".to_string(),
            schema: "Order".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unable to resolve property path 'shipCity' on schema 'Order'"
        );

        let err = FilterError::InvalidLiteral {
            value: "\"abc\"".to_string(),
            data_type: "Int32",
        };
        assert_eq!(err.to_string(), "cannot parse \"abc\" as Int32");
    }
}
