//! Expression tree to parameterized SQL.

use super::error::TranslationError;
use super::identifier::validate_identifier;
use super::pattern::{check_like_pattern, wildcard_to_glob_pattern, wildcard_to_sql_pattern};
use crate::ast::{Comparison, FieldPath, LogicalOp, Operator, QueryExpression, QueryValue, RangeValue};
use crate::dialect::Dialect;
use std::fmt;

/// Default bound on logical nesting during translation.
pub const MAX_TRANSLATION_DEPTH: usize = 1024;

/// A SQL condition and its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct SqlFragment {
    /// Condition text, without a leading `WHERE`.
    pub sql: String,
    /// Values for `$1..$n` (or `?1..?n`).
    pub params: Vec<QueryValue>,
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Translates expression trees into `WHERE` conditions for one dialect.
///
/// Values are always bound as parameters. Field names are checked against
/// the identifier rules and emitted bare unless `quote_identifiers` is set.
/// Bare-word equality ignores case through `lower()` on both sides unless
/// `fold_case` is turned off.
///
/// # Example
///
/// ```
/// use lql::{parse, Postgres, QueryValue, SqlTranslator};
///
/// let fragment = SqlTranslator::new(Postgres)
///     .translate(&parse("status:done AND priority:>=2").unwrap())
///     .unwrap();
/// assert_eq!(fragment.sql, "(lower(status) = lower($1)) AND (priority >= $2)");
/// assert_eq!(fragment.params, vec![QueryValue::from("done"), QueryValue::Int(2)]);
///
/// // Columns with a case-insensitive collation can compare directly
/// let fragment = SqlTranslator::new(Postgres)
///     .fold_case(false)
///     .translate(&parse("status:done AND priority:>=2").unwrap())
///     .unwrap();
/// assert_eq!(fragment.sql, "(status = $1) AND (priority >= $2)");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SqlTranslator<D: Dialect> {
    dialect: D,
    quote_identifiers: bool,
    fold_case: bool,
    max_depth: usize,
}

impl<D: Dialect> SqlTranslator<D> {
    /// Create a translator with bare identifiers.
    pub const fn new(dialect: D) -> Self {
        Self {
            dialect,
            quote_identifiers: false,
            fold_case: true,
            max_depth: MAX_TRANSLATION_DEPTH,
        }
    }

    /// Quote every identifier segment (`"users"."name"`).
    #[must_use]
    pub const fn quote_identifiers(mut self, enabled: bool) -> Self {
        self.quote_identifiers = enabled;
        self
    }

    /// Wrap both sides of case-insensitive equality in `lower()`. On by
    /// default; turn off when the columns already compare without case.
    #[must_use]
    pub const fn fold_case(mut self, enabled: bool) -> Self {
        self.fold_case = enabled;
        self
    }

    /// Set the nesting bound. Default is [`MAX_TRANSLATION_DEPTH`].
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// The target dialect.
    pub const fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Translate to SQL with bound parameters.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError` for unsafe identifiers or patterns,
    /// operator/value mismatches, and malformed nodes. No SQL is produced
    /// on error.
    pub fn translate(&self, expr: &QueryExpression) -> Result<SqlFragment, TranslationError> {
        let mut out = Output::new(self.dialect, false);
        self.write_expr(expr, &mut out)?;
        Ok(SqlFragment {
            sql: out.sql,
            params: out.params,
        })
    }

    /// Translate to SQL with values inlined as literals.
    ///
    /// For display and logging only; never execute the result.
    ///
    /// # Errors
    ///
    /// Same as [`translate`](Self::translate).
    pub fn translate_inline(&self, expr: &QueryExpression) -> Result<String, TranslationError> {
        let mut out = Output::new(self.dialect, true);
        self.write_expr(expr, &mut out)?;
        Ok(out.sql)
    }

    /// Walk the tree with an explicit work stack so output order matches
    /// the parenthesized infix form without recursing.
    fn write_expr(&self, expr: &QueryExpression, out: &mut Output<D>) -> Result<(), TranslationError> {
        enum Task<'a> {
            Expr(&'a QueryExpression, usize),
            Text(&'static str),
        }

        let mut tasks = vec![Task::Expr(expr, 0)];
        while let Some(task) = tasks.pop() {
            let (node, depth) = match task {
                Task::Text(text) => {
                    out.sql.push_str(text);
                    continue;
                },
                Task::Expr(node, depth) => (node, depth),
            };
            if depth > self.max_depth {
                return Err(TranslationError::NestingTooDeep {
                    max: self.max_depth,
                });
            }

            match node {
                QueryExpression::Comparison(cmp) => self.write_comparison(cmp, out)?,
                QueryExpression::Raw(raw) => out.raw(&raw.sql, &raw.params)?,
                QueryExpression::Logical(logical) => {
                    let left = &*logical.left;
                    match (logical.operator, logical.right.as_deref()) {
                        (LogicalOp::Not, None) => {
                            out.sql.push_str("NOT (");
                            tasks.push(Task::Text(")"));
                            tasks.push(Task::Expr(left, depth + 1));
                        },
                        (op @ (LogicalOp::And | LogicalOp::Or), Some(right)) => {
                            out.sql.push('(');
                            tasks.push(Task::Text(")"));
                            tasks.push(Task::Expr(right, depth + 1));
                            tasks.push(Task::Text(if op == LogicalOp::And {
                                ") AND ("
                            } else {
                                ") OR ("
                            }));
                            tasks.push(Task::Expr(left, depth + 1));
                        },
                        (LogicalOp::Not, Some(_)) => {
                            return Err(TranslationError::MalformedLogical(
                                "NOT takes exactly one operand",
                            ));
                        },
                        (LogicalOp::And | LogicalOp::Or, None) => {
                            return Err(TranslationError::MalformedLogical(
                                "AND and OR take exactly two operands",
                            ));
                        },
                    }
                },
            }
        }
        Ok(())
    }

    fn write_comparison(&self, cmp: &Comparison, out: &mut Output<D>) -> Result<(), TranslationError> {
        let field = self.field_sql(&cmp.field)?;
        let op = cmp.operator;

        if self.fold_case && cmp.folds_case() {
            out.sql.push_str(&format!("lower({field}) {} lower(", sql_operator(op)));
            out.bind(cmp.value.clone())?;
            out.sql.push(')');
            return Ok(());
        }

        match (op, &cmp.value) {
            // NULL handling
            (Operator::Eq, QueryValue::Null) => {
                out.sql.push_str(&format!("{field} IS NULL"));
                Ok(())
            },
            (Operator::Ne, QueryValue::Null) => {
                out.sql.push_str(&format!("{field} IS NOT NULL"));
                Ok(())
            },

            // Lists
            (Operator::In | Operator::Eq, QueryValue::Array(items)) => {
                out.list(&field, "IN", "1 = 0", items, op)
            },
            (Operator::NotIn | Operator::Ne, QueryValue::Array(items)) => {
                out.list(&field, "NOT IN", "1 = 1", items, op)
            },

            // Ranges
            (Operator::Between, QueryValue::Range(range)) => out.range(&field, range, op),
            (Operator::Between, QueryValue::Array(items)) => match items.as_slice() {
                [low, high] => out.range(
                    &field,
                    &RangeValue {
                        low: Some(low.clone()),
                        high: Some(high.clone()),
                        low_inclusive: true,
                        high_inclusive: true,
                    },
                    op,
                ),
                _ => Err(TranslationError::InvalidValue {
                    operator: op,
                    found: "a list that is not two bounds",
                }),
            },

            // Patterns
            (Operator::Like | Operator::ILike, QueryValue::String(pattern)) => {
                check_like_pattern(pattern)?;
                if op == Operator::Like
                    && let Some(glob) = self.dialect.glob_op()
                {
                    out.sql.push_str(&format!("{field} {glob} "));
                    return out.bind(QueryValue::String(wildcard_to_glob_pattern(pattern)));
                }
                let keyword = if op == Operator::ILike && self.dialect.supports_ilike() {
                    "ILIKE"
                } else {
                    "LIKE"
                };
                out.sql.push_str(&format!("{field} {keyword} "));
                out.bind(QueryValue::String(wildcard_to_sql_pattern(pattern)))?;
                out.sql.push_str(self.dialect.like_escape());
                Ok(())
            },
            (Operator::Regex, QueryValue::String(pattern)) => {
                let regex_op = self.dialect.regex_op().ok_or(TranslationError::UnsupportedOperator {
                    operator: op,
                    dialect: self.dialect.name(),
                })?;
                out.sql.push_str(&format!("{field} {regex_op} "));
                out.bind(QueryValue::String(pattern.clone()))
            },

            // Scalar comparisons
            (
                Operator::Eq | Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte,
                value,
            ) if value.is_scalar() => {
                if value == &QueryValue::Null {
                    return Err(TranslationError::InvalidValue {
                        operator: op,
                        found: "null",
                    });
                }
                out.sql.push_str(&format!("{field} {} ", sql_operator(op)));
                out.bind(value.clone())
            },

            (_, value) => Err(TranslationError::InvalidValue {
                operator: op,
                found: value_kind(value),
            }),
        }
    }

    fn field_sql(&self, field: &FieldPath) -> Result<String, TranslationError> {
        validate_identifier(field.as_str())?;
        if self.quote_identifiers {
            Ok(field
                .segments()
                .map(|s| self.dialect.quote_identifier(s))
                .collect::<Vec<_>>()
                .join("."))
        } else {
            Ok(field.as_str().to_string())
        }
    }
}

impl<D: Dialect + Default> Default for SqlTranslator<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

/// SQL text being assembled, with its parameters.
struct Output<D: Dialect> {
    dialect: D,
    inline: bool,
    sql: String,
    params: Vec<QueryValue>,
}

impl<D: Dialect> Output<D> {
    fn new(dialect: D, inline: bool) -> Self {
        Self {
            dialect,
            inline,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Emit a placeholder (or a literal, inline) for `value`.
    fn bind(&mut self, value: QueryValue) -> Result<(), TranslationError> {
        if let QueryValue::Float(n) = value
            && !n.is_finite()
        {
            return Err(TranslationError::NonFiniteNumber);
        }
        if self.inline {
            let literal = self.literal(&value);
            self.sql.push_str(&literal);
        } else {
            self.params.push(value);
            let placeholder = self.dialect.param(self.params.len());
            self.sql.push_str(&placeholder);
        }
        Ok(())
    }

    fn literal(&self, value: &QueryValue) -> String {
        match value {
            QueryValue::Null => "NULL".to_string(),
            QueryValue::Bool(b) => self.dialect.bool_lit(*b).to_string(),
            QueryValue::Int(n) => n.to_string(),
            QueryValue::Float(n) => format!("{n:?}"),
            QueryValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            // Lists and ranges are expanded before binding.
            QueryValue::Array(_) | QueryValue::Range(_) => "NULL".to_string(),
        }
    }

    fn list(
        &mut self,
        field: &str,
        keyword: &str,
        empty: &str,
        items: &[QueryValue],
        op: Operator,
    ) -> Result<(), TranslationError> {
        if let Some(bad) = items
            .iter()
            .find(|v| !v.is_scalar() || **v == QueryValue::Null)
        {
            return Err(TranslationError::InvalidValue {
                operator: op,
                found: if bad.is_scalar() {
                    "a null list element"
                } else {
                    "a nested list"
                },
            });
        }
        if items.is_empty() {
            self.sql.push_str(empty);
            return Ok(());
        }
        self.sql.push_str(&format!("{field} {keyword} ("));
        if self.inline {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.bind(item.clone())?;
            }
        } else {
            if items
                .iter()
                .any(|v| matches!(v, QueryValue::Float(n) if !n.is_finite()))
            {
                return Err(TranslationError::NonFiniteNumber);
            }
            let placeholders = self.dialect.in_list(items.len(), self.params.len() + 1);
            self.sql.push_str(&placeholders);
            self.params.extend(items.iter().cloned());
        }
        self.sql.push(')');
        Ok(())
    }

    fn range(&mut self, field: &str, range: &RangeValue, op: Operator) -> Result<(), TranslationError> {
        for bound in range.bounds() {
            if !bound.is_scalar() || *bound == QueryValue::Null {
                return Err(TranslationError::InvalidValue {
                    operator: op,
                    found: "a range bound that is not a value",
                });
            }
        }
        match (&range.low, &range.high) {
            (None, None) => {
                self.sql.push_str(&format!("{field} IS NOT NULL"));
            },
            (low, high) => {
                if let Some(low) = low {
                    let cmp = if range.low_inclusive { ">=" } else { ">" };
                    self.sql.push_str(&format!("{field} {cmp} "));
                    self.bind(low.clone())?;
                }
                if let Some(high) = high {
                    if low.is_some() {
                        self.sql.push_str(" AND ");
                    }
                    let cmp = if range.high_inclusive { "<=" } else { "<" };
                    self.sql.push_str(&format!("{field} {cmp} "));
                    self.bind(high.clone())?;
                }
            },
        }
        Ok(())
    }

    /// Copy raw SQL, renumbering each `?` to the dialect's placeholder.
    fn raw(&mut self, sql: &str, params: &[QueryValue]) -> Result<(), TranslationError> {
        let markers = sql.matches('?').count();
        if markers != params.len() {
            return Err(TranslationError::RawParameterMismatch {
                markers,
                params: params.len(),
            });
        }
        let mut params = params.iter();
        for c in sql.chars() {
            match (c, if c == '?' { params.next() } else { None }) {
                (_, Some(param)) => self.bind(param.clone())?,
                (c, None) => self.sql.push(c),
            }
        }
        Ok(())
    }
}

const fn sql_operator(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Ne => "<>",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Like => "LIKE",
        Operator::ILike => "ILIKE",
        Operator::In => "IN",
        Operator::NotIn => "NOT IN",
        Operator::Between => "BETWEEN",
        Operator::Regex => "~",
    }
}

const fn value_kind(value: &QueryValue) -> &'static str {
    match value {
        QueryValue::Null => "null",
        QueryValue::Bool(_) => "a boolean",
        QueryValue::Int(_) | QueryValue::Float(_) => "a number",
        QueryValue::String(_) => "a string",
        QueryValue::Array(_) => "a list",
        QueryValue::Range(_) => "a range",
    }
}
