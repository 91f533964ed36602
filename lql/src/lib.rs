// =============================================================================
// CRATE-LEVEL QUALITY LINTS (following Tokio/Serde standards)
// =============================================================================
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
// =============================================================================
// CLIPPY CONFIGURATION
// =============================================================================
#![allow(clippy::doc_markdown)] // Code items in docs - extensive doc changes needed
#![allow(clippy::missing_errors_doc)] // # Errors sections - doc-heavy
#![allow(clippy::items_after_statements)] // local enums in traversal functions
#![allow(clippy::module_name_repetitions)] // Type names matching module - acceptable
#![allow(clippy::return_self_not_must_use)] // Builder pattern methods return Self
#![allow(clippy::must_use_candidate)] // Builder methods - fluent API doesn't need must_use
#![allow(clippy::match_same_arms)] // Operator tables read better one arm per operator
#![allow(clippy::format_push_string)] // String building style preference
#![allow(clippy::double_must_use)] // Functions returning must_use types can have their own docs
#![allow(clippy::exhaustive_structs)] // AST nodes are plain data, matched by callers
#![allow(clippy::exhaustive_enums)] // AST enums are matched exhaustively by callers

//! # lql - Lucene-style query language to safe SQL
//!
//! Compiles user-supplied search queries into parameterized SQL `WHERE`
//! conditions in three stages sharing one tree:
//!
//! 1. **Parse** LQL text (`status:done AND priority:>=2`) or a Mongo-style
//!    JSON filter into a [`QueryExpression`].
//! 2. **Validate** the tree against [`SecurityOptions`]: field allow/deny
//!    lists, operator and value deny lists, depth, clause, length, and
//!    wildcard bounds. Accepted `LIKE` patterns have runs of `*` collapsed.
//! 3. **Translate** to SQL for Postgres or `SQLite`. Every value is a bound
//!    parameter; field names are re-checked as identifiers.
//!
//! ## Quick Start
//!
//! ```
//! use lql::prelude::*;
//!
//! let pipeline = postgres(SecurityOptions::new().allow_fields(&["status", "priority"]));
//!
//! let fragment = pipeline.compile(r#"status:"done" AND priority:>=2"#).unwrap();
//! assert_eq!(fragment.sql, "(status = $1) AND (priority >= $2)");
//! assert_eq!(fragment.params, vec![QueryValue::from("done"), QueryValue::Int(2)]);
//!
//! let err = pipeline.compile("password:hunter2").unwrap_err();
//! assert_eq!(err.code(), "query_rejected");
//! ```
//!
//! ## `SQLite` Dialect
//!
//! ```
//! use lql::prelude::*;
//!
//! let fragment = sqlite(SecurityOptions::new())
//!     .compile_json(r#"{"name": {"$like": "jo*"}, "age": {"$between": [18, 65]}}"#)
//!     .unwrap();
//! assert_eq!(
//!     fragment.sql,
//!     "(age >= ?1 AND age <= ?2) AND (name GLOB ?3)"
//! );
//! ```
//!
//! ## LQL Syntax
//!
//! | Query | SQL |
//! |-------|-----|
//! | `status:done` | `lower(status) = lower($1)` |
//! | `status:"Done"` | `status = $1` |
//! | `status:!=done` | `lower(status) <> lower($1)` |
//! | `age:>18`, `age:>=18`, `age:<65`, `age:<=65` | `age > $1`, ... |
//! | `name:jo*n?` | `name LIKE $1` (`jo%n_`); `name GLOB ?1` on `SQLite` |
//! | `status:(open OR pending)` | `status IN ($1, $2)` |
//! | `status:!=(closed OR spam)` | `status NOT IN ($1, $2)` |
//! | `age:[18 TO 65]`, `age:{18 TO *]` | `age >= $1 AND age <= $2`, `age > $1` |
//! | `deleted_at:null` | `deleted_at IS NULL` |
//! | `path:/^src/` | `path ~ $1` (Postgres only, denied by default) |
//! | `a:1 b:2`, `a:1 AND b:2`, `a:1 && b:2` | `(a = $1) AND (b = $2)` |
//! | `a:1 OR b:2`, `a:1 \|\| b:2` | `(a = $1) OR (b = $2)` |
//! | `NOT a:1`, `-a:1`, `!a:1` | `NOT (a = $1)` |

pub mod ast;
pub mod dialect;
pub mod parser;
pub mod pipeline;
pub mod translate;
pub mod validate;

pub use ast::{
    Comparison, FieldPath, LogicalExpr, LogicalOp, Operator, QueryExpression, QueryValue,
    RangeValue, RawCondition, simple,
};
pub use dialect::{Dialect, Postgres, Sqlite};
pub use parser::{ParseError, ParseErrorKind, parse, parse_json, parse_json_bytes};
pub use pipeline::{PipelineError, QueryPipeline};
pub use translate::{SqlFragment, SqlTranslator, TranslationError};
pub use validate::{
    SchemaFields, SecurityCategory, SecurityError, SecurityOptions, SecurityValidator,
};

/// Re-export miniserde's json module for structured filters.
///
/// # Example
///
/// ```
/// use lql::{json, QueryExpression};
///
/// let value: miniserde::json::Value = json::from_str(r#"{"name": {"$eq": "Alice"}}"#).unwrap();
/// let expr = QueryExpression::from_json(&value).unwrap();
/// assert_eq!(expr.to_string(), r#"name:"Alice""#);
/// ```
pub use miniserde::json;

/// Compile queries for Postgres.
#[must_use]
pub const fn postgres(options: SecurityOptions) -> QueryPipeline<Postgres> {
    QueryPipeline::postgres(options)
}

/// Compile queries for `SQLite`.
#[must_use]
pub const fn sqlite(options: SecurityOptions) -> QueryPipeline<Sqlite> {
    QueryPipeline::sqlite(options)
}

/// Prelude module for convenient imports.
///
/// ```
/// use lql::prelude::*;
///
/// let fragment = sqlite(SecurityOptions::new()).compile("id:7").unwrap();
/// assert_eq!(fragment.sql, "id = ?1");
/// ```
pub mod prelude {
    pub use crate::{
        Dialect, FieldPath, LogicalOp, Operator, ParseError, ParseErrorKind, PipelineError,
        Postgres, QueryExpression, QueryPipeline, QueryValue, SchemaFields, SecurityCategory,
        SecurityError, SecurityOptions, SecurityValidator, SqlFragment, SqlTranslator, Sqlite,
        TranslationError, json, parse, parse_json, postgres, simple, sqlite,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_compose() {
        let expr = parse("status:done AND priority:>=2").unwrap();
        let expr = SecurityValidator::default().validate(expr, None).unwrap();
        let fragment = SqlTranslator::new(Postgres).translate(&expr).unwrap();
        assert_eq!(fragment.sql, "(lower(status) = lower($1)) AND (priority >= $2)");
    }

    #[test]
    fn test_helpers_match_constructors() {
        let a = postgres(SecurityOptions::new()).compile("a:1 OR b:2").unwrap();
        let b = QueryPipeline::postgres(SecurityOptions::new())
            .compile("a:1 OR b:2")
            .unwrap();
        assert_eq!(a, b);
    }

    // =========================================================================
    // Worked examples
    // =========================================================================

    #[test]
    fn test_field_access_uniform_message() {
        let pipeline = postgres(
            SecurityOptions::new()
                .allow_fields(&["name", "password"])
                .deny_fields(&["password"]),
        );
        let denied = pipeline.compile("password:x").unwrap_err();
        let unknown = pipeline.compile("ssn:x").unwrap_err();
        assert_eq!(denied.to_string(), unknown.to_string());
    }

    #[test]
    fn test_depth_limit() {
        let pipeline = postgres(SecurityOptions::new().max_query_depth(2));
        let Err(PipelineError::Security(err)) = pipeline.compile("a:1 AND (b:2 OR (c:3 AND d:4))")
        else {
            panic!("expected security error");
        };
        assert_eq!(err.category, SecurityCategory::DepthExceeded);
    }

    #[test]
    fn test_complex_wildcard() {
        let pipeline = postgres(SecurityOptions::new());
        let Err(PipelineError::Security(err)) = pipeline.compile("name:*a*b*c*d*e*") else {
            panic!("expected security error");
        };
        assert_eq!(err.category, SecurityCategory::ComplexWildcardPattern);
    }

    #[test]
    fn test_injection_field_name() {
        let expr = simple("user.name; DROP TABLE users; --", Operator::Eq, "x".into()).unwrap();
        let err = SqlTranslator::new(Postgres).translate(&expr).unwrap_err();
        assert!(matches!(err, TranslationError::InvalidIdentifier { .. }));
    }
}

// ============================================================================
// API Contract Tests (compile-time assertions)
// ============================================================================
