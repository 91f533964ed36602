//! Security validation layer for parsed queries.
//!
//! This module provides:
//! - Field allow/deny lists, with the allow set derivable from a schema
//! - Operator and per-field value deny lists
//! - Depth, clause-count, value-length, and list-length limits
//! - Wildcard bounds and collapsing for `LIKE` patterns
//!
//! # Example
//!
//! ```
//! use lql::{parse, Operator, SecurityOptions, SecurityValidator};
//!
//! let validator = SecurityValidator::new(
//!     SecurityOptions::new()
//!         .allow_fields(&["name", "email", "status"])
//!         .deny_operators(&[Operator::Regex, Operator::ILike])
//!         .max_query_depth(3),
//! );
//!
//! let expr = validator.validate(parse("status:active name:jo**n").unwrap(), None).unwrap();
//! assert_eq!(expr.to_string(), "(status:active) AND (name:jo*n)");
//! ```

mod error;
mod options;
mod policy;
mod schema;
mod wildcard;

pub use error::{FIELD_ACCESS_MESSAGE, SecurityCategory, SecurityError};
pub use options::{
    DEFAULT_LIMIT, DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_CLAUSE_COUNT, DEFAULT_MAX_LIMIT,
    DEFAULT_MAX_QUERY_DEPTH, DEFAULT_MAX_VALUE_LENGTH, DEFAULT_QUERY_TIMEOUT, SecurityOptions,
};
pub use policy::SecurityValidator;
pub use schema::SchemaFields;
pub use wildcard::{
    MAX_WILDCARD_ALTERNATIONS, MAX_WILDCARDS, PatternViolation, check_pattern,
    collapse_wildcards, count_alternations, count_wildcards,
};
