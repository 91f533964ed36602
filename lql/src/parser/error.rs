//! Parse error type.

use thiserror::Error;

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Input is empty or whitespace only.
    EmptyQuery,
    /// Input exceeds the maximum accepted length.
    InputTooLong,
    /// A character that cannot start or continue the current construct.
    UnexpectedChar,
    /// Input ended in the middle of a construct.
    UnexpectedEnd,
    /// A quoted string was not closed.
    UnterminatedString,
    /// A `/regex/` term was not closed.
    UnterminatedRegex,
    /// Field name has an invalid shape.
    InvalidField,
    /// Malformed `[a TO b]` range.
    InvalidRange,
    /// A value that is not allowed in its position.
    InvalidValue,
    /// An object, nested list, or range where a scalar is required.
    NonScalarValue,
    /// Parentheses or `NOT` nested too deeply.
    NestingTooDeep,
    /// Structured input is not valid JSON.
    InvalidJson,
    /// Unknown `$operator` in structured input.
    UnknownOperator,
}

/// Malformed query syntax.
///
/// `position` is a 0-based character offset into the LQL input. Errors from
/// structured (JSON) input always report position 0.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    /// Error classification.
    pub kind: ParseErrorKind,
    /// Character offset of the error.
    pub position: usize,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    /// Create a parse error.
    pub fn new(kind: ParseErrorKind, position: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
        }
    }

    /// Create an error for structured input, which carries no position.
    pub(crate) fn structured(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, 0, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let err = ParseError::new(ParseErrorKind::UnexpectedChar, 7, "unexpected ')'");
        assert_eq!(err.to_string(), "unexpected ')' at position 7");
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar);
    }
}
