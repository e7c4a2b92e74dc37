//! Canonical operators and the alias registry that resolves incoming tokens.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{FilterError, FilterResult};

/// Comparison operators supported in filter predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    StartsWith,
    EndsWith,
    Contains,
}

impl ComparisonOp {
    /// Get the canonical key for this operator
    pub fn key(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Ne => "ne",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Le => "le",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Ge => "ge",
            ComparisonOp::StartsWith => "startswith",
            ComparisonOp::EndsWith => "endswith",
            ComparisonOp::Contains => "contains",
        }
    }
}

/// Composite boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn key(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

impl UnaryOp {
    pub fn key(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
        }
    }
}

/// Quantifiers over collection navigation properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifierOp {
    Any,
    All,
}

impl QuantifierOp {
    pub fn key(&self) -> &'static str {
        match self {
            QuantifierOp::Any => "any",
            QuantifierOp::All => "all",
        }
    }
}

/// Per node-kind alias tables mapping every accepted spelling, including
/// symbolic forms, to its canonical operator.
///
/// Built once and read-only afterwards; shared process-wide.
pub struct OperatorRegistry {
    comparison: HashMap<&'static str, ComparisonOp>,
    logical: HashMap<&'static str, LogicalOp>,
    unary: HashMap<&'static str, UnaryOp>,
    quantifier: HashMap<&'static str, QuantifierOp>,
}

impl OperatorRegistry {
    /// The shared registry instance
    pub fn global() -> &'static OperatorRegistry {
        static REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(OperatorRegistry::build)
    }

    fn build() -> OperatorRegistry {
        let mut comparison = HashMap::new();
        for (op, aliases) in [
            (ComparisonOp::Eq, &["eq", "=="][..]),
            (ComparisonOp::Ne, &["ne", "!="][..]),
            (ComparisonOp::Lt, &["lt", "<"][..]),
            (ComparisonOp::Le, &["le", "<=", "lte"][..]),
            (ComparisonOp::Gt, &["gt", ">"][..]),
            (ComparisonOp::Ge, &["ge", ">=", "gte"][..]),
            (ComparisonOp::StartsWith, &["startswith"][..]),
            (ComparisonOp::EndsWith, &["endswith"][..]),
            (ComparisonOp::Contains, &["contains"][..]),
        ] {
            for alias in aliases {
                comparison.insert(*alias, op);
            }
        }

        let mut logical = HashMap::new();
        for alias in ["and", "&&"] {
            logical.insert(alias, LogicalOp::And);
        }
        for alias in ["or", "||"] {
            logical.insert(alias, LogicalOp::Or);
        }

        let mut unary = HashMap::new();
        for alias in ["not", "!"] {
            unary.insert(alias, UnaryOp::Not);
        }

        let mut quantifier = HashMap::new();
        for alias in ["any", "some"] {
            quantifier.insert(alias, QuantifierOp::Any);
        }
        for alias in ["all", "every"] {
            quantifier.insert(alias, QuantifierOp::All);
        }

        OperatorRegistry {
            comparison,
            logical,
            unary,
            quantifier,
        }
    }

    /// Resolve a comparison operator token, failing on unknown tokens
    pub fn comparison(&self, token: &str) -> FilterResult<ComparisonOp> {
        self.try_comparison(token)
            .ok_or_else(|| FilterError::UnresolvableOperator {
                kind: "comparison",
                token: token.to_string(),
            })
    }

    /// Resolve a comparison operator token, returning `None` on unknown tokens
    pub fn try_comparison(&self, token: &str) -> Option<ComparisonOp> {
        self.comparison
            .get(token.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn logical(&self, token: &str) -> FilterResult<LogicalOp> {
        self.try_logical(token)
            .ok_or_else(|| FilterError::UnresolvableOperator {
                kind: "logical",
                token: token.to_string(),
            })
    }

    pub fn try_logical(&self, token: &str) -> Option<LogicalOp> {
        self.logical
            .get(token.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn unary(&self, token: &str) -> FilterResult<UnaryOp> {
        self.try_unary(token)
            .ok_or_else(|| FilterError::UnresolvableOperator {
                kind: "unary",
                token: token.to_string(),
            })
    }

    pub fn try_unary(&self, token: &str) -> Option<UnaryOp> {
        self.unary
            .get(token.trim().to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn quantifier(&self, token: &str) -> FilterResult<QuantifierOp> {
        self.try_quantifier(token)
            .ok_or_else(|| FilterError::UnresolvableOperator {
                kind: "quantifier",
                token: token.to_string(),
            })
    }

    pub fn try_quantifier(&self, token: &str) -> Option<QuantifierOp> {
        self.quantifier
            .get(token.trim().to_ascii_lowercase().as_str())
            .copied()
    }
}
