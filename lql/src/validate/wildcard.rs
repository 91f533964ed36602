//! Wildcard pattern bounds, shared by the validator and the translator.
//!
//! A pattern like `*a*a*a*a*a*b` is harmless for SQL `LIKE` engines but is the
//! classic catastrophic-backtracking shape for naive regex translations, so
//! both the number of wildcards and the number of wildcard-then-literal
//! alternations are bounded.

/// Maximum `*` / `?` characters in one pattern.
pub const MAX_WILDCARDS: usize = 10;

/// Maximum wildcard-then-literal alternations in one pattern.
pub const MAX_WILDCARD_ALTERNATIONS: usize = 4;

/// Why a pattern was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternViolation {
    /// More than [`MAX_WILDCARDS`] wildcards.
    TooManyWildcards(usize),
    /// More than [`MAX_WILDCARD_ALTERNATIONS`] alternations.
    TooComplex(usize),
}

#[inline]
pub(crate) const fn is_wildcard(c: char) -> bool {
    matches!(c, '*' | '?')
}

/// Number of `*` and `?` characters.
#[must_use]
pub fn count_wildcards(pattern: &str) -> usize {
    pattern.chars().filter(|&c| is_wildcard(c)).count()
}

/// Number of wildcard runs followed by at least one literal character.
///
/// Runs are counted once regardless of length, so collapsing wildcards never
/// changes the result.
#[must_use]
pub fn count_alternations(pattern: &str) -> usize {
    let mut count = 0;
    let mut in_run = false;
    for c in pattern.chars() {
        if is_wildcard(c) {
            in_run = true;
        } else if in_run {
            count += 1;
            in_run = false;
        }
    }
    count
}

/// Check both bounds. Alternations are checked first: an over-complex
/// pattern usually also has too many wildcards, and the shape is the more
/// specific diagnosis.
///
/// # Errors
///
/// Returns the first bound the pattern violates.
pub fn check_pattern(pattern: &str) -> Result<(), PatternViolation> {
    let alternations = count_alternations(pattern);
    if alternations > MAX_WILDCARD_ALTERNATIONS {
        return Err(PatternViolation::TooComplex(alternations));
    }
    let wildcards = count_wildcards(pattern);
    if wildcards > MAX_WILDCARDS {
        return Err(PatternViolation::TooManyWildcards(wildcards));
    }
    Ok(())
}

/// Collapse runs of `*` into one `*` and runs of `?` into one `?`.
///
/// # Example
///
/// ```
/// use lql::validate::collapse_wildcards;
///
/// assert_eq!(collapse_wildcards("a*****b"), "a*b");
/// assert_eq!(collapse_wildcards("a??*b"), "a?*b");
/// ```
#[must_use]
pub fn collapse_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut prev = None;
    for c in pattern.chars() {
        if is_wildcard(c) && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
