//! Translation errors.

use crate::ast::Operator;
use thiserror::Error;

/// An AST shape that cannot be turned into safe SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TranslationError {
    /// Field name is not a safe SQL identifier.
    #[error("invalid field name '{field}': {reason}")]
    InvalidIdentifier {
        /// The rejected field name.
        field: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// A `LIKE` pattern exceeds the length, wildcard, or complexity bounds.
    #[error("unsafe pattern: {0}")]
    UnsafePattern(String),

    /// The operator has no equivalent in the target dialect.
    #[error("operator {operator} is not supported by {dialect}")]
    UnsupportedOperator {
        /// The operator.
        operator: Operator,
        /// Dialect name.
        dialect: &'static str,
    },

    /// The value does not fit the operator.
    #[error("operator {operator} cannot take {found}")]
    InvalidValue {
        /// The operator.
        operator: Operator,
        /// What was found instead.
        found: &'static str,
    },

    /// A logical node with the wrong number of operands.
    #[error("malformed logical node: {0}")]
    MalformedLogical(&'static str),

    /// Tree is deeper than the translator will descend.
    #[error("expression nesting exceeds {max} levels")]
    NestingTooDeep {
        /// The limit.
        max: usize,
    },

    /// Raw condition `?` markers do not match its parameters.
    #[error("raw condition has {markers} placeholders but {params} parameters")]
    RawParameterMismatch {
        /// `?` markers in the SQL text.
        markers: usize,
        /// Parameters supplied.
        params: usize,
    },

    /// NaN or infinity cannot be bound portably.
    #[error("number is not finite")]
    NonFiniteNumber,
}
