//! SQL dialect implementations for Postgres and `SQLite`.
//!
//! Each dialect handles the specific syntax differences between databases.

/// SQL dialect trait for database-specific syntax.
pub trait Dialect: Clone + Copy {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Format a parameter placeholder (e.g., `$1` for Postgres, `?1` for `SQLite`).
    fn param(&self, idx: usize) -> String;

    /// Format a boolean literal.
    fn bool_lit(&self, val: bool) -> &'static str;

    /// Quote one identifier segment.
    ///
    /// Callers only pass segments that already passed identifier validation.
    fn quote_identifier(&self, segment: &str) -> String {
        format!("\"{segment}\"")
    }

    /// The regex match operator, if the database has one.
    fn regex_op(&self) -> Option<&'static str>;

    /// Case-sensitive glob operator, for databases whose `LIKE` ignores case.
    ///
    /// When present, `LIKE` comparisons are emitted with this operator and a
    /// glob pattern instead.
    fn glob_op(&self) -> Option<&'static str> {
        None
    }

    /// Whether ILIKE is supported natively.
    fn supports_ilike(&self) -> bool;

    /// Suffix appended to `LIKE` so that `\` escapes `%` and `_`.
    fn like_escape(&self) -> &'static str;

    /// Format an IN list with one placeholder per value, starting at `start_idx`.
    fn in_list(&self, count: usize, start_idx: usize) -> String {
        (start_idx..start_idx + count)
            .map(|i| self.param(i))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Postgres dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    #[inline]
    fn name(&self) -> &'static str {
        "postgres"
    }

    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("${idx}")
    }

    #[inline]
    fn bool_lit(&self, val: bool) -> &'static str {
        if val { "TRUE" } else { "FALSE" }
    }

    #[inline]
    fn regex_op(&self) -> Option<&'static str> {
        Some("~")
    }

    #[inline]
    fn supports_ilike(&self) -> bool {
        true
    }

    #[inline]
    fn like_escape(&self) -> &'static str {
        // Backslash is already the default LIKE escape.
        ""
    }
}

/// `SQLite` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    #[inline]
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[inline]
    fn param(&self, idx: usize) -> String {
        format!("?{idx}")
    }

    #[inline]
    fn bool_lit(&self, val: bool) -> &'static str {
        if val { "1" } else { "0" }
    }

    #[inline]
    fn regex_op(&self) -> Option<&'static str> {
        // REGEXP needs a user-defined function; not assumed.
        None
    }

    #[inline]
    fn glob_op(&self) -> Option<&'static str> {
        Some("GLOB")
    }

    #[inline]
    fn supports_ilike(&self) -> bool {
        // SQLite LIKE is case-insensitive for ASCII by default
        false
    }

    #[inline]
    fn like_escape(&self) -> &'static str {
        " ESCAPE '\\'"
    }
}
