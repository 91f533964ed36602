//! Core types shared by the parser, validator, and translator.

use crate::parser::{ParseError, ParseErrorKind};
use std::fmt;

/// Maximum number of dot-separated segments in a field path (`table.column`).
pub const MAX_FIELD_SEGMENTS: usize = 2;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// Equal: `=`
    Eq,
    /// Not equal: `<>`
    Ne,
    /// Greater than: `>`
    Gt,
    /// Greater than or equal: `>=`
    Gte,
    /// Less than: `<`
    Lt,
    /// Less than or equal: `<=`
    Lte,
    /// Case-sensitive wildcard match: `LIKE`
    Like,
    /// Case-insensitive wildcard match: `ILIKE` (Postgres) or `LIKE` (`SQLite`)
    ILike,
    /// Member of a list: `IN (...)`
    In,
    /// Not a member of a list: `NOT IN (...)`
    NotIn,
    /// Inside a range, each bound inclusive or exclusive.
    Between,
    /// Regular expression match: `~` (Postgres only)
    Regex,
}

impl Operator {
    /// Symbolic name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::Regex => "REGEX",
        }
    }

    /// Whether the operator takes a wildcard pattern.
    #[inline]
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::ILike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical operators for compound expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// Both operands must match: `AND`
    And,
    /// At least one operand must match: `OR`
    Or,
    /// Negate the single operand: `NOT`
    Not,
}

impl LogicalOp {
    /// SQL keyword for this operator.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

/// A dot-delimited field reference: `column` or `table.column`.
///
/// Construction only guarantees the shape (1-2 non-empty segments). Whether
/// the name is a safe SQL identifier is decided by the translator, and
/// whether it may be queried at all is decided by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    /// Create a field path, checking the segment shape.
    ///
    /// # Example
    ///
    /// ```
    /// use lql::FieldPath;
    ///
    /// assert!(FieldPath::new("users.name").is_ok());
    /// assert!(FieldPath::new("a.b.c").is_err());
    /// assert!(FieldPath::new("").is_err());
    /// ```
    pub fn new(path: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        let segments = path.split('.').count();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(ParseError::new(
                ParseErrorKind::InvalidField,
                0,
                "field name has an empty segment",
            ));
        }
        if segments > MAX_FIELD_SEGMENTS {
            return Err(ParseError::new(
                ParseErrorKind::InvalidField,
                0,
                format!("field name has more than {MAX_FIELD_SEGMENTS} segments"),
            ));
        }
        Ok(Self(path))
    }

    /// The full dotted path.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the dot-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The column name: the last segment.
    #[must_use]
    pub fn column(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Whether the path is table-qualified.
    #[inline]
    #[must_use]
    pub fn is_dotted(&self) -> bool {
        self.0.contains('.')
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Comparison values.
///
/// There is deliberately no object/map variant: structured values can never
/// reach the validator or the translator.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Finite float.
    Float(f64),
    /// Text; wildcard patterns for `LIKE` are strings too.
    String(String),
    /// Ordered list of scalars, for `IN` / `NOT IN`.
    Array(Vec<QueryValue>),
    /// Range bounds, for `BETWEEN`.
    Range(Box<RangeValue>),
}

impl QueryValue {
    /// Whether this is a scalar (not an array or range).
    #[inline]
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Range(_))
    }

    /// Borrow the string payload, if any.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a range value.
    #[must_use]
    pub fn range(
        low: Option<QueryValue>,
        low_inclusive: bool,
        high: Option<QueryValue>,
        high_inclusive: bool,
    ) -> Self {
        Self::Range(Box::new(RangeValue {
            low,
            high,
            low_inclusive,
            high_inclusive,
        }))
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for QueryValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A two-sided range. A missing bound is open (`*` in LQL).
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    /// Lower bound, `None` when open.
    pub low: Option<QueryValue>,
    /// Upper bound, `None` when open.
    pub high: Option<QueryValue>,
    /// `[` rather than `{`.
    pub low_inclusive: bool,
    /// `]` rather than `}`.
    pub high_inclusive: bool,
}

impl RangeValue {
    /// The present bounds, low first.
    pub fn bounds(&self) -> impl Iterator<Item = &QueryValue> {
        self.low.iter().chain(self.high.iter())
    }
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Field being compared.
    pub field: FieldPath,
    /// Comparison operator.
    pub operator: Operator,
    /// Right-hand side.
    pub value: QueryValue,
    /// String equality that ignores case. Set for unquoted bare words; quoted
    /// strings and structured filters match exactly.
    pub case_insensitive: bool,
}

impl Comparison {
    /// Whether this compares a string with `=` or `<>` while ignoring case.
    #[must_use]
    pub fn folds_case(&self) -> bool {
        self.case_insensitive
            && matches!(self.operator, Operator::Eq | Operator::Ne)
            && matches!(self.value, QueryValue::String(_))
    }
}

/// A logical node. `right` is `None` exactly when `operator` is `Not`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpr {
    /// `AND`, `OR` or `NOT`.
    pub operator: LogicalOp,
    /// First operand, or the only one for `NOT`.
    pub left: Box<QueryExpression>,
    /// Second operand.
    pub right: Option<Box<QueryExpression>>,
}

/// Backend-specific condition that bypasses field and value introspection.
///
/// `?` markers in `sql` are bound, in order, to `params`. Raw nodes are only
/// constructible from code; the parsers never produce them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCondition {
    /// Backend SQL with `?` markers.
    pub sql: String,
    /// One value per marker.
    pub params: Vec<QueryValue>,
}

/// A query expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    /// A leaf predicate.
    Comparison(Comparison),
    /// `AND` / `OR` / `NOT` over sub-expressions.
    Logical(LogicalExpr),
    /// Opaque escape hatch.
    Raw(RawCondition),
}

impl QueryExpression {
    /// Create a comparison leaf.
    #[must_use]
    pub fn comparison(field: FieldPath, operator: Operator, value: QueryValue) -> Self {
        Self::Comparison(Comparison {
            field,
            operator,
            value,
            case_insensitive: false,
        })
    }

    /// Create a string comparison (`Eq` or `Ne`) that ignores case, the form
    /// an unquoted LQL word takes.
    #[must_use]
    pub fn comparison_ignore_case(field: FieldPath, operator: Operator, value: String) -> Self {
        Self::Comparison(Comparison {
            field,
            operator,
            value: QueryValue::String(value),
            case_insensitive: true,
        })
    }

    /// Create an `AND` node.
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::Logical(LogicalExpr {
            operator: LogicalOp::And,
            left: Box::new(left),
            right: Some(Box::new(right)),
        })
    }

    /// Create an `OR` node.
    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Logical(LogicalExpr {
            operator: LogicalOp::Or,
            left: Box::new(left),
            right: Some(Box::new(right)),
        })
    }

    /// Create a unary `NOT` node.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Logical(LogicalExpr {
            operator: LogicalOp::Not,
            left: Box::new(inner),
            right: None,
        })
    }

    /// Create a raw condition.
    pub fn raw(sql: impl Into<String>, params: Vec<QueryValue>) -> Self {
        Self::Raw(RawCondition {
            sql: sql.into(),
            params,
        })
    }

    /// Fold a list of expressions into a left-deep chain of `op` nodes.
    ///
    /// Returns `None` for an empty list.
    #[must_use]
    pub fn fold(op: LogicalOp, exprs: Vec<Self>) -> Option<Self> {
        let mut iter = exprs.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |left, right| match op {
            LogicalOp::Or => Self::or(left, right),
            LogicalOp::And | LogicalOp::Not => Self::and(left, right),
        }))
    }
}

/// Helper function to create a comparison from a field name.
///
/// # Example
///
/// ```
/// use lql::{simple, Operator, QueryValue};
///
/// let expr = simple("status", Operator::Eq, QueryValue::from("done")).unwrap();
/// assert_eq!(expr.to_string(), r#"status:"done""#);
/// ```
pub fn simple(
    field: &str,
    operator: Operator,
    value: QueryValue,
) -> Result<QueryExpression, ParseError> {
    Ok(QueryExpression::comparison(
        FieldPath::new(field)?,
        operator,
        value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_shapes() {
        assert!(FieldPath::new("name").is_ok());
        assert!(FieldPath::new("users.name").is_ok());
        assert!(FieldPath::new("a.b.c").is_err());
        assert!(FieldPath::new("a.").is_err());
        assert!(FieldPath::new(".a").is_err());
        assert!(FieldPath::new("").is_err());
    }

    #[test]
    fn test_field_path_accepts_unsafe_identifiers() {
        // Shape only; identifier safety is checked at translation.
        let path = FieldPath::new("user.name; DROP TABLE users; --").unwrap();
        assert!(path.is_dotted());
        assert_eq!(path.segments().count(), 2);
    }

    #[test]
    fn test_fold_left_deep() {
        let a = simple("a", Operator::Eq, QueryValue::Int(1)).unwrap();
        let b = simple("b", Operator::Eq, QueryValue::Int(2)).unwrap();
        let c = simple("c", Operator::Eq, QueryValue::Int(3)).unwrap();

        let folded = QueryExpression::fold(LogicalOp::And, vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            folded,
            Some(QueryExpression::and(QueryExpression::and(a, b), c))
        );
        assert_eq!(QueryExpression::fold(LogicalOp::Or, vec![]), None);
    }

    #[test]
    fn test_value_scalar() {
        assert!(QueryValue::Null.is_scalar());
        assert!(QueryValue::from("x").is_scalar());
        assert!(!QueryValue::Array(vec![]).is_scalar());
        assert!(!QueryValue::range(None, true, None, true).is_scalar());
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(Operator::NotIn.to_string(), "NOT IN");
        assert!(Operator::ILike.is_pattern());
        assert!(!Operator::Regex.is_pattern());
    }
}
