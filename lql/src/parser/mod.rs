//! Query parsers: LQL text and Mongo-style JSON.
//!
//! Both produce a [`QueryExpression`](crate::QueryExpression) and both reject
//! object values while building it.

mod error;
mod json;
mod lql;

pub use error::{ParseError, ParseErrorKind};
pub use json::{parse_json, parse_json_bytes};
pub use lql::{MAX_INPUT_LENGTH, MAX_NESTING_DEPTH, parse};
