//! Canonical LQL rendering.
//!
//! For every tree the parser produces, `parse(&expr.to_string())` yields a
//! structurally equal tree. Logical operands are always parenthesized. Exact
//! strings are quoted and case-insensitive words are written bare, so the
//! output does not depend on precedence or on bare-word typing rules.

use super::types::{Comparison, LogicalOp, Operator, QueryExpression, QueryValue, RangeValue};
use std::fmt::{self, Write};

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Task<'a> {
            Expr(&'a QueryExpression),
            Text(&'static str),
        }

        let mut stack = vec![Task::Expr(self)];
        while let Some(task) = stack.pop() {
            let expr = match task {
                Task::Text(text) => {
                    f.write_str(text)?;
                    continue;
                },
                Task::Expr(expr) => expr,
            };
            match expr {
                QueryExpression::Comparison(cmp) => write_comparison(f, cmp)?,
                QueryExpression::Raw(raw) => write!(f, "<raw: {}>", raw.sql)?,
                QueryExpression::Logical(logical) => match (logical.operator, &logical.right) {
                    (LogicalOp::Not, _) | (_, None) => {
                        f.write_str("NOT (")?;
                        stack.push(Task::Text(")"));
                        stack.push(Task::Expr(&logical.left));
                    },
                    (op, Some(right)) => {
                        f.write_char('(')?;
                        stack.push(Task::Text(")"));
                        stack.push(Task::Expr(right));
                        stack.push(Task::Text(match op {
                            LogicalOp::Or => ") OR (",
                            LogicalOp::And | LogicalOp::Not => ") AND (",
                        }));
                        stack.push(Task::Expr(&logical.left));
                    },
                },
            }
        }
        Ok(())
    }
}

fn write_comparison(f: &mut fmt::Formatter<'_>, cmp: &Comparison) -> fmt::Result {
    write!(f, "{}:", cmp.field)?;
    if cmp.folds_case()
        && let QueryValue::String(word) = &cmp.value
        && !word.is_empty()
    {
        if cmp.operator == Operator::Ne {
            f.write_str("!=")?;
        }
        return write_word(f, word);
    }
    match (cmp.operator, &cmp.value) {
        (Operator::Between, QueryValue::Array(items)) => match items.as_slice() {
            [low, high] => {
                f.write_char('[')?;
                write_value(f, low)?;
                f.write_str(" TO ")?;
                write_value(f, high)?;
                f.write_char(']')
            },
            _ => write_group(f, items),
        },
        (Operator::Eq | Operator::In, QueryValue::Array(items)) => write_group(f, items),
        (Operator::Ne | Operator::NotIn, QueryValue::Array(items)) => {
            f.write_str("!=")?;
            write_group(f, items)
        },
        (Operator::Like | Operator::ILike, QueryValue::String(pattern)) => {
            write_bare(f, pattern)
        },
        (Operator::Regex, QueryValue::String(pattern)) => {
            f.write_char('/')?;
            for c in pattern.chars() {
                if c == '/' {
                    f.write_char('\\')?;
                }
                f.write_char(c)?;
            }
            f.write_char('/')
        },
        (_, QueryValue::Range(range)) => write_range(f, range),
        (op, value) => {
            let prefix = match op {
                Operator::Ne | Operator::NotIn => "!=",
                Operator::Gt => ">",
                Operator::Gte => ">=",
                Operator::Lt => "<",
                Operator::Lte => "<=",
                _ => "",
            };
            f.write_str(prefix)?;
            write_value(f, value)
        },
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, items: &[QueryValue]) -> fmt::Result {
    f.write_char('(')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" OR ")?;
        }
        write_value(f, item)?;
    }
    f.write_char(')')
}

fn write_range(f: &mut fmt::Formatter<'_>, range: &RangeValue) -> fmt::Result {
    f.write_char(if range.low_inclusive { '[' } else { '{' })?;
    match &range.low {
        Some(v) => write_value(f, v)?,
        None => f.write_char('*')?,
    }
    f.write_str(" TO ")?;
    match &range.high {
        Some(v) => write_value(f, v)?,
        None => f.write_char('*')?,
    }
    f.write_char(if range.high_inclusive { ']' } else { '}' })
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &QueryValue) -> fmt::Result {
    match value {
        QueryValue::Null => f.write_str("null"),
        QueryValue::Bool(b) => write!(f, "{b}"),
        QueryValue::Int(n) => write!(f, "{n}"),
        // Debug keeps the fractional part, so 2.0 does not re-parse as an int.
        QueryValue::Float(n) => write!(f, "{n:?}"),
        QueryValue::String(s) => write_quoted(f, s),
        QueryValue::Array(items) => write_group(f, items),
        QueryValue::Range(range) => write_range(f, range),
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

/// Write a bare term, escaping everything the term reader would stop on or
/// interpret as a value prefix. Wildcards stay live.
fn write_bare(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    for c in s.chars() {
        if needs_escape(c) {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

/// Write a bare word that re-parses as the same case-insensitive string.
/// Wildcards are escaped, as is a first character that would otherwise type
/// the word as a number, boolean or null.
fn write_word(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let retypes = matches!(s, "true" | "false" | "null");
    for (i, c) in s.chars().enumerate() {
        let numeric_start = i == 0 && (c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
        if needs_escape(c) || matches!(c, '*' | '?') || numeric_start || (i == 0 && retypes) {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

/// Characters that must be backslash-escaped inside a bare LQL term.
fn needs_escape(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\\' | '"' | '(' | ')' | '[' | ']' | '{' | '}' | ':' | '/' | '>' | '<' | '=' | '!'
        )
}
