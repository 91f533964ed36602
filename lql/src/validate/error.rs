//! Security policy violations.

use std::fmt;
use thiserror::Error;

/// Message shared by every field-access rejection.
///
/// Denied, unknown, and not-allowed fields are indistinguishable to the caller.
pub const FIELD_ACCESS_MESSAGE: &str = "query references a field that is not available";

/// Which guardrail a query violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SecurityCategory {
    /// Field is denied, or absent from the allow set.
    FieldAccess,
    /// Logical nesting exceeds `max_query_depth`.
    DepthExceeded,
    /// Leaf clause count exceeds `max_clause_count`.
    ClauseExceeded,
    /// A string value exceeds `max_value_length`.
    ValueTooLong,
    /// A list value exceeds `max_array_length`.
    ArrayTooLong,
    /// A structured value where only scalars are accepted.
    ObjectValueRejected,
    /// Too many `*` / `?` in a pattern.
    ExcessiveWildcards,
    /// Too many wildcard/literal alternations in a pattern.
    ComplexWildcardPattern,
    /// Value is on the field's deny list.
    DeniedValue,
    /// Table-qualified field while dot notation is disabled.
    DotNotationDisallowed,
    /// Operator is on the deny list.
    OperatorDenied,
}

impl SecurityCategory {
    /// Stable name, suitable for logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FieldAccess => "FieldAccess",
            Self::DepthExceeded => "DepthExceeded",
            Self::ClauseExceeded => "ClauseExceeded",
            Self::ValueTooLong => "ValueTooLong",
            Self::ArrayTooLong => "ArrayTooLong",
            Self::ObjectValueRejected => "ObjectValueRejected",
            Self::ExcessiveWildcards => "ExcessiveWildcards",
            Self::ComplexWildcardPattern => "ComplexWildcardPattern",
            Self::DeniedValue => "DeniedValue",
            Self::DotNotationDisallowed => "DotNotationDisallowed",
            Self::OperatorDenied => "OperatorDenied",
        }
    }
}

impl fmt::Display for SecurityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query rejected by the security validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SecurityError {
    /// Which guardrail fired.
    pub category: SecurityCategory,
    /// Client-safe description.
    pub message: String,
}

impl SecurityError {
    /// Create a security error.
    pub fn new(category: SecurityCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// The generic field-access rejection.
    #[must_use]
    pub fn field_access() -> Self {
        Self::new(SecurityCategory::FieldAccess, FIELD_ACCESS_MESSAGE)
    }
}
