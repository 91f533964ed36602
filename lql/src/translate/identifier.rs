//! Field identifier validation for SQL injection prevention.

use super::error::TranslationError;
use crate::ast::MAX_FIELD_SEGMENTS;

/// Maximum length of one identifier segment.
pub const MAX_SEGMENT_LENGTH: usize = 64;

/// Check that a field path is safe to emit as SQL text.
///
/// A valid field:
/// - Starts with an ASCII letter
/// - Contains only ASCII letters, digits, `_`, and `.`
/// - Has at most two non-empty dot-separated segments
/// - Has no segment longer than 64 characters
/// - Has no segment containing `__`
///
/// # Examples
///
/// ```
/// use lql::translate::validate_identifier;
///
/// assert!(validate_identifier("users").is_ok());
/// assert!(validate_identifier("users.created_at").is_ok());
///
/// assert!(validate_identifier("_private").is_err());    // leading underscore
/// assert!(validate_identifier("a.b.c").is_err());       // three segments
/// assert!(validate_identifier("meta__data").is_err());  // double underscore
/// assert!(validate_identifier("user.name; DROP TABLE users; --").is_err());
/// ```
///
/// # Errors
///
/// Returns `TranslationError::InvalidIdentifier` naming the broken rule.
pub fn validate_identifier(field: &str) -> Result<(), TranslationError> {
    let invalid = |reason| {
        Err(TranslationError::InvalidIdentifier {
            field: field.to_string(),
            reason,
        })
    };

    match field.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {},
        Some(_) => return invalid("must start with a letter"),
        None => return invalid("empty"),
    }
    if !field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return invalid("only ASCII letters, digits, '_' and '.' are allowed");
    }

    let mut segments = 0;
    for segment in field.split('.') {
        segments += 1;
        if segments > MAX_FIELD_SEGMENTS {
            return invalid("too many segments");
        }
        if segment.is_empty() {
            return invalid("empty segment");
        }
        if segment.len() > MAX_SEGMENT_LENGTH {
            return invalid("segment too long");
        }
        if segment.contains("__") {
            return invalid("segment contains '__'");
        }
    }
    Ok(())
}

/// Whether a field path is safe to emit as SQL text.
#[inline]
#[must_use]
pub fn is_valid_identifier(field: &str) -> bool {
    validate_identifier(field).is_ok()
}
