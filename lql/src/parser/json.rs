//! Mongo-style JSON filters.
//!
//! Structured input produces the same tree as LQL text, so it goes through
//! the same validator and translator.
//!
//! # Supported Syntax
//!
//! | Syntax | Example | LQL |
//! |--------|---------|-----|
//! | Implicit `$eq` | `{"name": "Alice"}` | `name:"Alice"` |
//! | Explicit operator | `{"age": {"$gte": 18}}` | `age:>=18` |
//! | Several operators | `{"age": {"$gte": 18, "$lt": 65}}` | `age:>=18 AND age:<65` |
//! | Multiple fields | `{"a": 1, "b": 2}` | `a:1 AND b:2` |
//! | `$and` / `$or` | `{"$or": [{...}, {...}]}` | `(...) OR (...)` |
//! | `$not` | `{"$not": {...}}` | `NOT (...)` |
//! | `$in` / `$nin` | `{"s": {"$in": ["a", "b"]}}` | `s:(a OR b)` |
//! | `$between` | `{"age": {"$between": [18, 65]}}` | `age:[18 TO 65]` |
//!
//! Objects are never values. `{"a": {"$eq": {"$ne": null}}}` and
//! `{"a": {"$in": [{"$gt": ""}]}}` fail with [`ParseErrorKind::NonScalarValue`].

use super::error::{ParseError, ParseErrorKind};
use super::lql::{MAX_INPUT_LENGTH, MAX_NESTING_DEPTH};
use crate::ast::{FieldPath, LogicalOp, Operator, QueryExpression, QueryValue};
use miniserde::json::{Number, Object, Value as JsonValue};

/// Parse a Mongo-style filter from a JSON string.
///
/// # Example
///
/// ```
/// use lql::parse_json;
///
/// let expr = parse_json(r#"{"status": "done", "priority": {"$gte": 2}}"#).unwrap();
/// assert_eq!(expr.count_clauses(), 2);
/// ```
///
/// # Errors
///
/// Returns `ParseError` with position 0 if the JSON is invalid or malformed.
pub fn parse_json(json_str: &str) -> Result<QueryExpression, ParseError> {
    if json_str.chars().count() > MAX_INPUT_LENGTH {
        return Err(ParseError::structured(
            ParseErrorKind::InputTooLong,
            format!("filter exceeds {MAX_INPUT_LENGTH} characters"),
        ));
    }
    let json: JsonValue = miniserde::json::from_str(json_str).map_err(|_| {
        ParseError::structured(ParseErrorKind::InvalidJson, "invalid JSON syntax")
    })?;
    QueryExpression::from_json(&json)
}

/// Parse a Mongo-style filter from raw request bytes.
///
/// # Errors
///
/// Returns `ParseError` if the bytes are not UTF-8 or not a valid filter.
pub fn parse_json_bytes(bytes: &[u8]) -> Result<QueryExpression, ParseError> {
    let s = std::str::from_utf8(bytes).map_err(|_| {
        ParseError::structured(ParseErrorKind::InvalidJson, "filter is not valid UTF-8")
    })?;
    parse_json(s)
}

impl Operator {
    /// Parse from a Mongo-style operator name (`$eq`, `$gte`, ...).
    ///
    /// Accepts names with and without the `$` prefix.
    ///
    /// # Example
    ///
    /// ```
    /// use lql::Operator;
    ///
    /// assert_eq!(Operator::from_mongo("$eq"), Some(Operator::Eq));
    /// assert_eq!(Operator::from_mongo("nin"), Some(Operator::NotIn));
    /// assert_eq!(Operator::from_mongo("$where"), None);
    /// ```
    #[must_use]
    pub fn from_mongo(s: &str) -> Option<Self> {
        let s = s.strip_prefix('$').unwrap_or(s);

        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            "nin" => Some(Self::NotIn),
            "like" => Some(Self::Like),
            "ilike" => Some(Self::ILike),
            "regex" => Some(Self::Regex),
            "between" => Some(Self::Between),
            _ => None,
        }
    }
}

impl QueryValue {
    /// Convert a JSON value. Arrays may only contain scalars; objects are
    /// rejected everywhere.
    ///
    /// # Example
    ///
    /// ```
    /// use lql::QueryValue;
    /// use miniserde::json::{Number, Object, Value as JsonValue};
    ///
    /// let json = JsonValue::Number(Number::I64(42));
    /// assert_eq!(QueryValue::from_json(&json), Ok(QueryValue::Int(42)));
    /// assert!(QueryValue::from_json(&JsonValue::Object(Object::new())).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ParseError` of kind `NonScalarValue` for objects and nested
    /// arrays, and `InvalidValue` for integers outside the `i64` range.
    pub fn from_json(json: &JsonValue) -> Result<Self, ParseError> {
        match json {
            JsonValue::Array(arr) => arr
                .iter()
                .map(|item| match item {
                    JsonValue::Array(_) => Err(non_scalar("arrays cannot be nested")),
                    _ => scalar_from_json(item),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            _ => scalar_from_json(json),
        }
    }
}

fn scalar_from_json(json: &JsonValue) -> Result<QueryValue, ParseError> {
    match json {
        JsonValue::Null => Ok(QueryValue::Null),
        JsonValue::Bool(b) => Ok(QueryValue::Bool(*b)),
        JsonValue::Number(Number::I64(i)) => Ok(QueryValue::Int(*i)),
        JsonValue::Number(Number::U64(u)) => i64::try_from(*u).map(QueryValue::Int).map_err(|_| {
            ParseError::structured(ParseErrorKind::InvalidValue, "integer out of range")
        }),
        JsonValue::Number(Number::F64(f)) if f.is_finite() => Ok(QueryValue::Float(*f)),
        JsonValue::Number(Number::F64(_)) => Err(ParseError::structured(
            ParseErrorKind::InvalidValue,
            "number is not finite",
        )),
        JsonValue::String(s) => Ok(QueryValue::String(s.clone())),
        JsonValue::Array(_) => Err(non_scalar("expected a scalar value, found an array")),
        JsonValue::Object(_) => Err(non_scalar("objects are not valid filter values")),
    }
}

fn non_scalar(message: &str) -> ParseError {
    ParseError::structured(ParseErrorKind::NonScalarValue, message)
}

impl QueryExpression {
    /// Build an expression from a parsed Mongo-style JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the document is not a valid filter.
    pub fn from_json(json: &JsonValue) -> Result<Self, ParseError> {
        filter_from_json(json, 0)
    }
}

fn filter_from_json(json: &JsonValue, depth: usize) -> Result<QueryExpression, ParseError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::structured(
            ParseErrorKind::NestingTooDeep,
            format!("filter nesting exceeds {MAX_NESTING_DEPTH} levels"),
        ));
    }
    let JsonValue::Object(obj) = json else {
        return Err(ParseError::structured(
            ParseErrorKind::InvalidValue,
            "expected a filter object",
        ));
    };
    if obj.is_empty() {
        return Err(ParseError::structured(
            ParseErrorKind::EmptyQuery,
            "filter object cannot be empty",
        ));
    }

    let mut clauses = Vec::with_capacity(obj.len());
    for (key, value) in obj.iter() {
        let clause = match key.as_str() {
            "$and" => logical_list(LogicalOp::And, value, depth)?,
            "$or" => logical_list(LogicalOp::Or, value, depth)?,
            "$not" => QueryExpression::not(filter_from_json(value, depth + 1)?),
            k if k.starts_with('$') => {
                return Err(ParseError::structured(
                    ParseErrorKind::UnknownOperator,
                    format!("unknown logical operator '{k}'"),
                ));
            },
            field => field_filter(field, value)?,
        };
        clauses.push(clause);
    }

    fold(LogicalOp::And, clauses)
}

fn logical_list(
    op: LogicalOp,
    json: &JsonValue,
    depth: usize,
) -> Result<QueryExpression, ParseError> {
    let JsonValue::Array(arr) = json else {
        return Err(ParseError::structured(
            ParseErrorKind::InvalidValue,
            format!("${} expects an array of filters", op.keyword().to_lowercase()),
        ));
    };
    let exprs = arr
        .iter()
        .map(|item| filter_from_json(item, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;
    fold(op, exprs)
}

fn fold(op: LogicalOp, exprs: Vec<QueryExpression>) -> Result<QueryExpression, ParseError> {
    QueryExpression::fold(op, exprs).ok_or_else(|| {
        ParseError::structured(
            ParseErrorKind::EmptyQuery,
            format!("${} requires at least one filter", op.keyword().to_lowercase()),
        )
    })
}

/// `{"field": value}` or `{"field": {"$op": value, ...}}`.
fn field_filter(field: &str, value: &JsonValue) -> Result<QueryExpression, ParseError> {
    let field = FieldPath::new(field)?;

    match value {
        JsonValue::Object(ops) => operator_filters(&field, ops),
        JsonValue::Array(_) => Err(ParseError::structured(
            ParseErrorKind::InvalidValue,
            "list values require $in, $nin or $between",
        )),
        _ => Ok(QueryExpression::comparison(
            field,
            Operator::Eq,
            scalar_from_json(value)?,
        )),
    }
}

fn operator_filters(field: &FieldPath, ops: &Object) -> Result<QueryExpression, ParseError> {
    if ops.is_empty() {
        return Err(non_scalar("objects are not valid filter values"));
    }
    let mut clauses = Vec::with_capacity(ops.len());
    for (key, value) in ops.iter() {
        if !key.starts_with('$') {
            return Err(non_scalar("objects are not valid filter values"));
        }
        let op = Operator::from_mongo(key).ok_or_else(|| {
            ParseError::structured(
                ParseErrorKind::UnknownOperator,
                format!("unknown operator '{key}'"),
            )
        })?;
        let value = operator_value(op, key, value)?;
        clauses.push(QueryExpression::comparison(field.clone(), op, value));
    }
    fold(LogicalOp::And, clauses)
}

/// Check the value type an operator expects.
fn operator_value(op: Operator, key: &str, json: &JsonValue) -> Result<QueryValue, ParseError> {
    let expected = |what: &str| {
        ParseError::structured(
            ParseErrorKind::InvalidValue,
            format!("operator '{key}' expects {what}"),
        )
    };

    match op {
        Operator::In | Operator::NotIn => match json {
            JsonValue::Array(_) => QueryValue::from_json(json),
            JsonValue::Object(_) => Err(non_scalar("objects are not valid filter values")),
            _ => Err(expected("an array")),
        },
        Operator::Between => match json {
            JsonValue::Array(arr) if arr.len() == 2 => {
                let low = scalar_from_json(&arr[0])?;
                let high = scalar_from_json(&arr[1])?;
                if low == QueryValue::Null || high == QueryValue::Null {
                    return Err(ParseError::structured(
                        ParseErrorKind::InvalidRange,
                        "null is not a valid range bound",
                    ));
                }
                Ok(QueryValue::range(Some(low), true, Some(high), true))
            },
            JsonValue::Array(_) => Err(ParseError::structured(
                ParseErrorKind::InvalidRange,
                format!("operator '{key}' expects exactly 2 values"),
            )),
            JsonValue::Object(_) => Err(non_scalar("objects are not valid filter values")),
            _ => Err(expected("an array of 2 values")),
        },
        Operator::Like | Operator::ILike | Operator::Regex => match json {
            JsonValue::String(s) => Ok(QueryValue::String(s.clone())),
            JsonValue::Object(_) => Err(non_scalar("objects are not valid filter values")),
            _ => Err(expected("a string")),
        },
        Operator::Eq | Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            scalar_from_json(json)
        },
    }
}
