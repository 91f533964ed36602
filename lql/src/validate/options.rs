//! Security configuration.
//!
//! # Environment Variables
//!
//! [`SecurityOptions::from_env`] overlays the defaults with:
//!
//! | Variable                 | Default | Description                         |
//! |--------------------------|---------|-------------------------------------|
//! | `LQL_MAX_QUERY_DEPTH`    | 10      | Maximum logical nesting             |
//! | `LQL_MAX_CLAUSE_COUNT`   | 50      | Maximum leaf clauses                |
//! | `LQL_MAX_VALUE_LENGTH`   | 1000    | Maximum string value length (chars) |
//! | `LQL_MAX_ARRAY_LENGTH`   | 100     | Maximum `IN` list length            |
//! | `LQL_DEFAULT_LIMIT`      | 100     | Page size when none is requested    |
//! | `LQL_MAX_LIMIT`          | 1000    | Largest page size a caller may ask  |
//! | `LQL_QUERY_TIMEOUT_MS`   | 30000   | Execution timeout for the adapter   |
//! | `LQL_SANITIZE_WILDCARDS` | true    | Bound and collapse `LIKE` patterns  |
//! | `LQL_ALLOW_DOT_NOTATION` | true    | Accept `table.column` fields        |
//!
//! Unset or unparsable variables keep the default.

use crate::ast::{Operator, QueryValue};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

/// Default maximum logical nesting.
pub const DEFAULT_MAX_QUERY_DEPTH: usize = 10;
/// Default maximum leaf clauses.
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 50;
/// Default maximum string value length, in characters.
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 1000;
/// Default maximum list length.
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 100;
/// Default page size.
pub const DEFAULT_LIMIT: usize = 100;
/// Default page size ceiling.
pub const DEFAULT_MAX_LIMIT: usize = 1000;
/// Default execution timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Guardrails applied to every user query.
///
/// Immutable once built; share one instance across threads.
///
/// # Example
///
/// ```
/// use lql::{Operator, SecurityOptions};
///
/// let options = SecurityOptions::new()
///     .allow_fields(&["status", "priority", "title"])
///     .deny_operators(&[Operator::Regex, Operator::ILike])
///     .max_clause_count(10);
/// assert_eq!(options.max_clause_count, 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct SecurityOptions {
    /// Queryable fields. Empty = derive from the schema, if one is given.
    pub allowed_fields: BTreeSet<String>,
    /// Fields that may never be queried.
    pub deny_fields: BTreeSet<String>,
    /// Per-field values that may never be compared against.
    pub deny_values: BTreeMap<String, Vec<QueryValue>>,
    /// Operators that may never be used.
    pub denied_operators: Vec<Operator>,
    /// Maximum logical nesting.
    pub max_query_depth: usize,
    /// Maximum leaf clauses.
    pub max_clause_count: usize,
    /// Maximum string value length, in characters.
    pub max_value_length: usize,
    /// Maximum list length.
    pub max_array_length: usize,
    /// Bound and collapse `LIKE` / `ILIKE` wildcards.
    pub sanitize_wildcards: bool,
    /// Accept table-qualified (`table.column`) fields.
    pub allow_dot_notation: bool,
    /// Page size when the caller asks for none. Used by the execution layer.
    pub default_limit: usize,
    /// Largest page size. Used by the execution layer.
    pub max_limit: usize,
    /// Execution timeout. Used by the execution layer.
    pub query_timeout: Duration,
}

impl SecurityOptions {
    /// Create options with secure defaults.
    ///
    /// Defaults:
    /// - No field restrictions beyond the schema
    /// - Denies `Regex` (`ReDoS` prevention)
    /// - Depth 10, 50 clauses, 1000-character values, 100-element lists
    /// - Wildcard sanitization on, dot notation allowed
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_fields: BTreeSet::new(),
            deny_fields: BTreeSet::new(),
            deny_values: BTreeMap::new(),
            denied_operators: vec![Operator::Regex],
            max_query_depth: DEFAULT_MAX_QUERY_DEPTH,
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            sanitize_wildcards: true,
            allow_dot_notation: true,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Defaults with no operator deny list.
    ///
    /// **Warning:** only for trusted, internal filters. `Regex` is allowed.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            denied_operators: Vec::new(),
            ..Self::new()
        }
    }

    /// Defaults overlaid with `LQL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by `LQL_*` name.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::new();
        Self {
            max_query_depth: setting(&lookup, "LQL_MAX_QUERY_DEPTH", d.max_query_depth),
            max_clause_count: setting(&lookup, "LQL_MAX_CLAUSE_COUNT", d.max_clause_count),
            max_value_length: setting(&lookup, "LQL_MAX_VALUE_LENGTH", d.max_value_length),
            max_array_length: setting(&lookup, "LQL_MAX_ARRAY_LENGTH", d.max_array_length),
            default_limit: setting(&lookup, "LQL_DEFAULT_LIMIT", d.default_limit),
            max_limit: setting(&lookup, "LQL_MAX_LIMIT", d.max_limit),
            query_timeout: Duration::from_millis(setting(
                &lookup,
                "LQL_QUERY_TIMEOUT_MS",
                u64::try_from(d.query_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
            sanitize_wildcards: setting(&lookup, "LQL_SANITIZE_WILDCARDS", d.sanitize_wildcards),
            allow_dot_notation: setting(&lookup, "LQL_ALLOW_DOT_NOTATION", d.allow_dot_notation),
            ..d
        }
    }

    /// Set allowed fields (whitelist).
    ///
    /// Replaces any previous list. If empty, the schema decides.
    #[must_use]
    pub fn allow_fields(mut self, fields: &[&str]) -> Self {
        self.allowed_fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set denied fields (blacklist). Wins over the allow list.
    #[must_use]
    pub fn deny_fields(mut self, fields: &[&str]) -> Self {
        self.deny_fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Forbid comparing `field` against any of `values`.
    ///
    /// Numbers and numeric strings match each other: denying `3` also
    /// denies `"3"`.
    #[must_use]
    pub fn deny_values(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = QueryValue>,
    ) -> Self {
        self.deny_values
            .entry(field.to_string())
            .or_default()
            .extend(values);
        self
    }

    /// Set denied operators. Replaces the default `[Regex]`.
    #[must_use]
    pub fn deny_operators(mut self, ops: &[Operator]) -> Self {
        self.denied_operators = ops.to_vec();
        self
    }

    /// Set maximum logical nesting.
    #[must_use]
    pub const fn max_query_depth(mut self, depth: usize) -> Self {
        self.max_query_depth = depth;
        self
    }

    /// Set maximum leaf clauses.
    #[must_use]
    pub const fn max_clause_count(mut self, count: usize) -> Self {
        self.max_clause_count = count;
        self
    }

    /// Set maximum string value length, in characters.
    #[must_use]
    pub const fn max_value_length(mut self, length: usize) -> Self {
        self.max_value_length = length;
        self
    }

    /// Set maximum `IN` list length.
    #[must_use]
    pub const fn max_array_length(mut self, length: usize) -> Self {
        self.max_array_length = length;
        self
    }

    /// Enable or disable wildcard bounds and collapsing.
    #[must_use]
    pub const fn sanitize_wildcards(mut self, enabled: bool) -> Self {
        self.sanitize_wildcards = enabled;
        self
    }

    /// Accept or reject table-qualified fields.
    #[must_use]
    pub const fn allow_dot_notation(mut self, enabled: bool) -> Self {
        self.allow_dot_notation = enabled;
        self
    }

    /// Set the page size used when none is requested.
    #[must_use]
    pub const fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the largest page size.
    #[must_use]
    pub const fn max_limit(mut self, limit: usize) -> Self {
        self.max_limit = limit;
        self
    }

    /// Set the execution timeout.
    #[must_use]
    pub const fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Page size to use for a request: `requested` (or `default_limit`)
    /// clamped to `1..=max_limit`.
    ///
    /// # Example
    ///
    /// ```
    /// use lql::SecurityOptions;
    ///
    /// let options = SecurityOptions::new();
    /// assert_eq!(options.effective_limit(None), 100);
    /// assert_eq!(options.effective_limit(Some(0)), 1);
    /// assert_eq!(options.effective_limit(Some(50_000)), 1000);
    /// ```
    #[must_use]
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A value that can be read from a configuration variable.
trait Setting: Sized {
    fn parse_setting(raw: &str) -> Option<Self>;
}

impl Setting for usize {
    fn parse_setting(raw: &str) -> Option<Self> {
        usize::from_str(raw.trim()).ok()
    }
}

impl Setting for u64 {
    fn parse_setting(raw: &str) -> Option<Self> {
        u64::from_str(raw.trim()).ok()
    }
}

impl Setting for bool {
    fn parse_setting(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

fn setting<T: Setting>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };
    T::parse_setting(&raw).unwrap_or_else(|| {
        tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
        default
    })
}
