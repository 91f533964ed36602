//! SQL translation for validated expression trees.
//!
//! Translation re-checks identifiers and `LIKE` patterns on its own, so a
//! tree that skipped validation still cannot inject SQL through a field
//! name or blow up a pattern match.

mod error;
mod identifier;
mod pattern;
mod sql;

pub use error::TranslationError;
pub use identifier::{MAX_SEGMENT_LENGTH, is_valid_identifier, validate_identifier};
pub use pattern::{
    MAX_PATTERN_LENGTH, check_like_pattern, wildcard_to_glob_pattern, wildcard_to_sql_pattern,
};
pub use sql::{MAX_TRANSLATION_DEPTH, SqlFragment, SqlTranslator};
