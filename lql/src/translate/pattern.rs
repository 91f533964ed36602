//! LQL wildcard patterns to SQL `LIKE` and `GLOB` patterns.

use super::error::TranslationError;
use crate::validate::{PatternViolation, check_pattern};

/// Maximum pattern length, in characters.
pub const MAX_PATTERN_LENGTH: usize = 100;

/// Convert `*` / `?` wildcards to `%` / `_`.
///
/// Literal `\`, `%` and `_` are backslash-escaped first, so they can never be
/// mistaken for translated wildcards.
///
/// # Example
///
/// ```
/// use lql::translate::wildcard_to_sql_pattern;
///
/// assert_eq!(wildcard_to_sql_pattern("jo*n?"), "jo%n_");
/// assert_eq!(wildcard_to_sql_pattern("100%_done*"), r"100\%\_done%");
/// ```
#[must_use]
pub fn wildcard_to_sql_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 4);
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.replace('*', "%").replace('?', "_")
}

/// Convert an LQL wildcard pattern to a glob pattern.
///
/// `*` and `?` carry over unchanged. A literal `[` would open a character
/// class, so it becomes `[[]`. Everything else, `%` and `_` included, is
/// already literal in a glob.
///
/// # Example
///
/// ```
/// use lql::translate::wildcard_to_glob_pattern;
///
/// assert_eq!(wildcard_to_glob_pattern("jo*n?"), "jo*n?");
/// assert_eq!(wildcard_to_glob_pattern("[draft]_50%*"), "[[]draft]_50%*");
/// ```
#[must_use]
pub fn wildcard_to_glob_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    for c in pattern.chars() {
        if c == '[' {
            out.push_str("[[]");
        } else {
            out.push(c);
        }
    }
    out
}

/// Guards applied before any pattern is emitted, whether or not the
/// validator already ran.
///
/// # Errors
///
/// Returns `TranslationError::UnsafePattern` if the pattern is too long, has
/// too many wildcards, or alternates wildcards and literals too often.
pub fn check_like_pattern(pattern: &str) -> Result<(), TranslationError> {
    let length = pattern.chars().count();
    if length > MAX_PATTERN_LENGTH {
        return Err(TranslationError::UnsafePattern(format!(
            "pattern has {length} characters, the maximum is {MAX_PATTERN_LENGTH}"
        )));
    }
    check_pattern(pattern).map_err(|violation| {
        TranslationError::UnsafePattern(match violation {
            PatternViolation::TooManyWildcards(n) => format!("pattern has {n} wildcards"),
            PatternViolation::TooComplex(n) => {
                format!("pattern has {n} wildcard alternations")
            },
        })
    })
}
