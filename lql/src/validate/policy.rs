//! The security validator.
//!
//! Every check runs before the tree is touched, so a rejected query is never
//! partially sanitized. Passes, in order:
//!
//! 1. Dot-notation gate
//! 2. Field allow/deny lists, then the operator deny list
//! 3. Denied values
//! 4. Depth
//! 5. Clause count
//! 6. Value shape and length
//! 7. Wildcard bounds
//!
//! Raw nodes are opaque: they count as clauses and nest like any leaf, but
//! their SQL, fields, and parameters are not inspected.

use super::error::{SecurityCategory, SecurityError};
use super::options::SecurityOptions;
use super::schema::SchemaFields;
use super::wildcard::{MAX_WILDCARDS, PatternViolation, check_pattern, collapse_wildcards};
use crate::ast::{Comparison, FieldPath, QueryExpression, QueryValue};
use std::collections::BTreeSet;
use tracing::trace;

/// Enforces [`SecurityOptions`] on parsed queries.
///
/// # Example
///
/// ```
/// use lql::{parse, SecurityCategory, SecurityOptions, SecurityValidator};
///
/// let validator = SecurityValidator::new(SecurityOptions::new().max_value_length(5));
/// let err = validator.validate(parse(r#"name:"JohnDoe""#).unwrap(), None).unwrap_err();
/// assert_eq!(err.category, SecurityCategory::ValueTooLong);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecurityValidator {
    options: SecurityOptions,
}

impl SecurityValidator {
    /// Create a validator.
    #[must_use]
    pub const fn new(options: SecurityOptions) -> Self {
        Self { options }
    }

    /// The options this validator enforces.
    #[must_use]
    pub const fn options(&self) -> &SecurityOptions {
        &self.options
    }

    /// Check `expr` and return it with `LIKE` / `ILIKE` wildcards collapsed.
    ///
    /// `schema` supplies the allow set when `allowed_fields` is empty.
    ///
    /// # Errors
    ///
    /// Returns the first violated guardrail. The tree is dropped.
    pub fn validate(
        &self,
        mut expr: QueryExpression,
        schema: Option<&SchemaFields>,
    ) -> Result<QueryExpression, SecurityError> {
        self.check(&expr, schema)?;
        if self.options.sanitize_wildcards {
            sanitize_patterns(&mut expr);
        }
        Ok(expr)
    }

    /// Run every check without modifying the tree.
    ///
    /// # Errors
    ///
    /// Returns the first violated guardrail.
    pub fn check(
        &self,
        expr: &QueryExpression,
        schema: Option<&SchemaFields>,
    ) -> Result<(), SecurityError> {
        let comparisons = expr.comparisons();

        self.check_dot_notation(&comparisons)?;
        trace!(pass = "dot_notation", "validation pass ok");

        self.check_field_access(&comparisons, schema)?;
        self.check_operators(&comparisons)?;
        trace!(pass = "field_access", "validation pass ok");

        self.check_denied_values(&comparisons)?;
        trace!(pass = "denied_values", "validation pass ok");

        self.check_depth(expr)?;
        trace!(pass = "depth", "validation pass ok");

        self.check_clause_count(expr)?;
        trace!(pass = "clause_count", "validation pass ok");

        for cmp in &comparisons {
            self.check_value(&cmp.value)?;
        }
        trace!(pass = "values", "validation pass ok");

        if self.options.sanitize_wildcards {
            for cmp in &comparisons {
                check_wildcards(cmp)?;
            }
            trace!(pass = "wildcards", "validation pass ok");
        }
        Ok(())
    }

    fn check_dot_notation(&self, comparisons: &[&Comparison]) -> Result<(), SecurityError> {
        if self.options.allow_dot_notation {
            return Ok(());
        }
        if comparisons.iter().any(|cmp| cmp.field.is_dotted()) {
            return Err(SecurityError::new(
                SecurityCategory::DotNotationDisallowed,
                "table-qualified field names are not allowed",
            ));
        }
        Ok(())
    }

    fn check_field_access(
        &self,
        comparisons: &[&Comparison],
        schema: Option<&SchemaFields>,
    ) -> Result<(), SecurityError> {
        let derived;
        let allowed: &BTreeSet<String> = if self.options.allowed_fields.is_empty() {
            derived = schema.map(SchemaFields::field_names).unwrap_or_default();
            &derived
        } else {
            &self.options.allowed_fields
        };

        for cmp in comparisons {
            let field = cmp.field.as_str();
            let denied = self.is_denied_field(&cmp.field);
            let unknown = !allowed.is_empty() && !allowed.contains(field);
            if denied || unknown {
                trace!(field, denied, "field rejected");
                return Err(SecurityError::field_access());
            }
        }
        Ok(())
    }

    /// A bare deny entry covers every table's column of that name. A
    /// qualified entry also covers the bare column, which may resolve to it.
    fn is_denied_field(&self, field: &FieldPath) -> bool {
        let deny = &self.options.deny_fields;
        deny.contains(field.as_str())
            || deny.contains(field.column())
            || (!field.is_dotted()
                && deny
                    .iter()
                    .any(|entry| entry.rsplit('.').next() == Some(field.as_str())))
    }

    fn check_operators(&self, comparisons: &[&Comparison]) -> Result<(), SecurityError> {
        match comparisons
            .iter()
            .find(|cmp| self.options.denied_operators.contains(&cmp.operator))
        {
            Some(cmp) => Err(SecurityError::new(
                SecurityCategory::OperatorDenied,
                format!("operator {} is not allowed", cmp.operator),
            )),
            None => Ok(()),
        }
    }

    fn check_denied_values(&self, comparisons: &[&Comparison]) -> Result<(), SecurityError> {
        if self.options.deny_values.is_empty() {
            return Ok(());
        }
        for cmp in comparisons {
            let Some(denied) = self
                .options
                .deny_values
                .get(cmp.field.as_str())
                .or_else(|| self.options.deny_values.get(cmp.field.column()))
            else {
                continue;
            };
            let fold = cmp.folds_case();
            let hit = scalars(&cmp.value)
                .any(|value| denied.iter().any(|d| loosely_equal(value, d, fold)));
            if hit {
                return Err(SecurityError::new(
                    SecurityCategory::DeniedValue,
                    "query compares a field against a value that is not allowed",
                ));
            }
        }
        Ok(())
    }

    /// Explicit stack; fails as soon as a node exceeds the limit, before
    /// looking at its children.
    fn check_depth(&self, expr: &QueryExpression) -> Result<(), SecurityError> {
        let max = self.options.max_query_depth;
        let mut stack = vec![(expr, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if depth > max {
                return Err(SecurityError::new(
                    SecurityCategory::DepthExceeded,
                    format!("query nesting exceeds the maximum depth of {max}"),
                ));
            }
            stack.extend(node.children().map(|child| (child, depth + 1)));
        }
        Ok(())
    }

    fn check_clause_count(&self, expr: &QueryExpression) -> Result<(), SecurityError> {
        let max = self.options.max_clause_count;
        let count = expr.count_clauses();
        if count > max {
            return Err(SecurityError::new(
                SecurityCategory::ClauseExceeded,
                format!("query has {count} clauses, the maximum is {max}"),
            ));
        }
        Ok(())
    }

    fn check_value(&self, value: &QueryValue) -> Result<(), SecurityError> {
        match value {
            QueryValue::Array(items) => {
                if items.len() > self.options.max_array_length {
                    return Err(SecurityError::new(
                        SecurityCategory::ArrayTooLong,
                        format!(
                            "list has more than {} values",
                            self.options.max_array_length
                        ),
                    ));
                }
                items.iter().try_for_each(|item| self.check_scalar(item))
            },
            QueryValue::Range(range) => range.bounds().try_for_each(|b| self.check_scalar(b)),
            scalar => self.check_scalar(scalar),
        }
    }

    fn check_scalar(&self, value: &QueryValue) -> Result<(), SecurityError> {
        match value {
            QueryValue::Array(_) | QueryValue::Range(_) => Err(SecurityError::new(
                SecurityCategory::ObjectValueRejected,
                "only scalar values are allowed here",
            )),
            QueryValue::String(s) if s.chars().count() > self.options.max_value_length => {
                Err(SecurityError::new(
                    SecurityCategory::ValueTooLong,
                    format!(
                        "value exceeds the maximum length of {} characters",
                        self.options.max_value_length
                    ),
                ))
            },
            QueryValue::Null
            | QueryValue::Bool(_)
            | QueryValue::Int(_)
            | QueryValue::Float(_)
            | QueryValue::String(_) => Ok(()),
        }
    }
}

impl From<SecurityOptions> for SecurityValidator {
    fn from(options: SecurityOptions) -> Self {
        Self::new(options)
    }
}

fn check_wildcards(cmp: &Comparison) -> Result<(), SecurityError> {
    if !cmp.operator.is_pattern() {
        return Ok(());
    }
    let QueryValue::String(pattern) = &cmp.value else {
        return Ok(());
    };
    check_pattern(pattern).map_err(|violation| match violation {
        PatternViolation::TooManyWildcards(n) => SecurityError::new(
            SecurityCategory::ExcessiveWildcards,
            format!("pattern has {n} wildcards, the maximum is {MAX_WILDCARDS}"),
        ),
        PatternViolation::TooComplex(_) => SecurityError::new(
            SecurityCategory::ComplexWildcardPattern,
            "pattern alternates wildcards and literals too many times",
        ),
    })
}

fn sanitize_patterns(expr: &mut QueryExpression) {
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node {
            QueryExpression::Comparison(cmp) => {
                if cmp.operator.is_pattern()
                    && let QueryValue::String(pattern) = &mut cmp.value
                {
                    *pattern = collapse_wildcards(pattern);
                }
            },
            QueryExpression::Logical(logical) => {
                stack.push(logical.left.as_mut());
                if let Some(right) = logical.right.as_deref_mut() {
                    stack.push(right);
                }
            },
            QueryExpression::Raw(_) => {},
        }
    }
}

/// The scalar, every list element, or both range bounds.
fn scalars(value: &QueryValue) -> Box<dyn Iterator<Item = &QueryValue> + '_> {
    match value {
        QueryValue::Array(items) => Box::new(items.iter()),
        QueryValue::Range(range) => Box::new(range.bounds()),
        scalar => Box::new(std::iter::once(scalar)),
    }
}

/// Equality with number/string coercion: `3`, `3.0` and `"3"` are equal.
/// With `fold`, strings also compare without case.
fn loosely_equal(a: &QueryValue, b: &QueryValue, fold: bool) -> bool {
    if a == b {
        return true;
    }
    if fold
        && let (QueryValue::String(x), QueryValue::String(y)) = (a, b)
        && x.to_lowercase() == y.to_lowercase()
    {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_number(value: &QueryValue) -> Option<f64> {
    match value {
        QueryValue::Int(n) => Some(*n as f64),
        QueryValue::Float(n) => Some(*n),
        QueryValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
