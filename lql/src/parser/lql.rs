//! Recursive descent parser for the Lucene-like query language.
//!
//! Grammar, lowest precedence first:
//!   query      = or_expr ;
//!   or_expr    = and_expr { ("OR" | "||") and_expr } ;
//!   and_expr   = unary { [ "AND" | "&&" ] unary } ;      (juxtaposition is AND)
//!   unary      = { "+" } ( ("NOT" | "!" | "-") unary | primary ) ;
//!   primary    = "(" or_expr ")" | comparison ;
//!   comparison = field ":" value_clause ;
//!   value_clause
//!              = [ ">" | ">=" | "<" | "<=" | "=" | "!=" ] value
//!              | "[" | "{"  bound "TO" bound  "]" | "}"
//!              | "/" regex "/"
//!              | "(" value { ["OR"] value } ")" ;
//!
//! Bare values are typed (`true`, `false`, `null`, integers, decimals), quoted
//! values are always strings, and a bare value with an unescaped `*` or `?`
//! is a `LIKE` pattern.

use super::error::{ParseError, ParseErrorKind};
use crate::ast::{FieldPath, Operator, QueryExpression, QueryValue};
use std::str::FromStr;

/// Maximum accepted input length, in characters.
pub const MAX_INPUT_LENGTH: usize = 16 * 1024;

/// Maximum nesting of parentheses and `NOT` prefixes.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse an LQL string into an expression tree.
///
/// # Example
///
/// ```
/// use lql::{parse, LogicalOp, QueryExpression};
///
/// let expr = parse("status:done AND priority:>=2").unwrap();
/// let QueryExpression::Logical(logical) = expr else { panic!() };
/// assert_eq!(logical.operator, LogicalOp::And);
/// ```
pub fn parse(input: &str) -> Result<QueryExpression, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() > MAX_INPUT_LENGTH {
        return Err(ParseError::new(
            ParseErrorKind::InputTooLong,
            MAX_INPUT_LENGTH,
            format!("query exceeds {MAX_INPUT_LENGTH} characters"),
        ));
    }

    let mut parser = Parser {
        chars,
        pos: 0,
        nesting: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(ParseError::new(ParseErrorKind::EmptyQuery, 0, "empty query"));
    }

    let expr = parser.parse_or()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(parser.unexpected(c));
    }
    Ok(expr)
}

impl FromStr for QueryExpression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// A bare term as read from the input, escapes resolved.
struct Term {
    text: String,
    start: usize,
    /// Contains an unescaped `*` or `?`.
    wildcard: bool,
    /// Contains a backslash escape.
    escaped: bool,
    /// Contains an escaped `*` or `?`.
    escaped_wildcard: bool,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_or(&mut self) -> Result<QueryExpression, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.eat_keyword("OR") || self.eat_symbol("||") {
                let right = self.parse_and()?;
                left = QueryExpression::or(left, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<QueryExpression, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if matches!(self.peek(), None | Some(')'))
                || self.at_keyword("OR")
                || self.at_symbol("||")
            {
                return Ok(left);
            }
            // Explicit AND is optional: juxtaposed terms are conjoined.
            let _ = self.eat_keyword("AND") || self.eat_symbol("&&");
            let right = self.parse_unary()?;
            left = QueryExpression::and(left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<QueryExpression, ParseError> {
        loop {
            self.skip_ws();
            if !self.eat_prefix('+') {
                break;
            }
        }

        let start = self.pos;
        if self.eat_keyword("NOT") || self.eat_prefix('!') || self.eat_prefix('-') {
            self.enter(start)?;
            let inner = self.parse_unary()?;
            self.nesting -= 1;
            return Ok(QueryExpression::not(inner));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<QueryExpression, ParseError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None => Err(self.end("expected a field:value term")),
            Some('(') => {
                self.pos += 1;
                self.enter(start)?;
                let expr = self.parse_or()?;
                self.skip_ws();
                self.expect(')')?;
                self.nesting -= 1;
                Ok(expr)
            },
            Some(_) if self.at_keyword("AND") || self.at_keyword("OR") => Err(ParseError::new(
                ParseErrorKind::UnexpectedChar,
                start,
                "operator without a left operand",
            )),
            Some(_) => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<QueryExpression, ParseError> {
        let term = self.read_term()?;
        if term.text.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => self.end("expected a field name"),
            });
        }
        if !self.eat(':') {
            return Err(match self.peek() {
                None => self.end("expected ':' after field name"),
                Some(_) => ParseError::new(
                    ParseErrorKind::UnexpectedChar,
                    self.pos,
                    format!("expected ':' after field name '{}'", term.text),
                ),
            });
        }
        if term.wildcard {
            return Err(ParseError::new(
                ParseErrorKind::InvalidField,
                term.start,
                "wildcards are not allowed in field names",
            ));
        }
        let field = FieldPath::new(term.text)
            .map_err(|e| ParseError::new(ParseErrorKind::InvalidField, term.start, e.message))?;

        self.parse_value_clause(field)
    }

    // =========================================================================
    // Values
    // =========================================================================

    fn parse_value_clause(&mut self, field: FieldPath) -> Result<QueryExpression, ParseError> {
        let (operator, value) = match self.peek() {
            None => return Err(self.end("expected a value after ':'")),
            Some(c) if c.is_whitespace() => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedChar,
                    self.pos,
                    "expected a value after ':'",
                ));
            },
            Some('>' | '<' | '=' | '!') => return self.parse_comparator_value(field),
            Some('"') => (Operator::Eq, QueryValue::String(self.read_quoted()?)),
            Some('/') => (Operator::Regex, QueryValue::String(self.read_regex()?)),
            Some('[' | '{') => (Operator::Between, self.read_range()?),
            Some('(') => (Operator::In, QueryValue::Array(self.read_group()?)),
            Some(_) => {
                let term = self.read_term()?;
                if term.text.is_empty() {
                    return Err(self.unexpected_here());
                }
                if term.wildcard {
                    if term.escaped_wildcard {
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidValue,
                            term.start,
                            "escaped and unescaped wildcards cannot be mixed in one term",
                        ));
                    }
                    (Operator::Like, QueryValue::String(term.text))
                } else {
                    return Ok(bare_comparison(field, Operator::Eq, &term));
                }
            },
        };
        Ok(QueryExpression::comparison(field, operator, value))
    }

    fn parse_comparator_value(&mut self, field: FieldPath) -> Result<QueryExpression, ParseError> {
        let start = self.pos;
        let op = if self.eat_symbol(">=") {
            Operator::Gte
        } else if self.eat_symbol("<=") {
            Operator::Lte
        } else if self.eat_symbol("!=") {
            Operator::Ne
        } else if self.eat('>') {
            Operator::Gt
        } else if self.eat('<') {
            Operator::Lt
        } else if self.eat('=') {
            Operator::Eq
        } else {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedChar,
                start,
                "expected a comparison operator",
            ));
        };

        let (operator, value) = match self.peek() {
            None => return Err(self.end("expected a value after comparison operator")),
            Some('"') => (op, QueryValue::String(self.read_quoted()?)),
            Some('(') => match op {
                Operator::Eq => (Operator::In, QueryValue::Array(self.read_group()?)),
                Operator::Ne => (Operator::NotIn, QueryValue::Array(self.read_group()?)),
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidValue,
                        self.pos,
                        "value groups cannot follow an ordering operator",
                    ));
                },
            },
            Some('[' | '{') => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidValue,
                    self.pos,
                    "ranges cannot follow a comparison operator",
                ));
            },
            Some(_) => {
                // Wildcards are literal after an explicit operator.
                let term = self.read_term()?;
                if term.text.is_empty() {
                    return Err(self.unexpected_here());
                }
                return Ok(bare_comparison(field, op, &term));
            },
        };
        Ok(QueryExpression::comparison(field, operator, value))
    }

    fn read_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedString,
                        start,
                        "unterminated quoted string",
                    ));
                },
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedString,
                            start,
                            "unterminated quoted string",
                        ));
                    },
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn read_regex(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedRegex,
                        start,
                        "unterminated regular expression",
                    ));
                },
                Some('/') => break,
                Some('\\') => match self.bump() {
                    Some('/') => out.push('/'),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    },
                    None => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedRegex,
                            start,
                            "unterminated regular expression",
                        ));
                    },
                },
                Some(c) => out.push(c),
            }
        }
        if out.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidValue,
                start,
                "empty regular expression",
            ));
        }
        Ok(out)
    }

    fn read_range(&mut self) -> Result<QueryValue, ParseError> {
        let low_inclusive = self.bump() == Some('[');

        self.skip_ws();
        let low = self.read_bound()?;
        self.skip_ws();
        if !self.eat_keyword("TO") {
            return Err(match self.peek() {
                None => self.end("unclosed range"),
                Some(_) => ParseError::new(
                    ParseErrorKind::InvalidRange,
                    self.pos,
                    "expected 'TO' in range",
                ),
            });
        }
        self.skip_ws();
        let high = self.read_bound()?;
        self.skip_ws();

        let high_inclusive = match self.bump() {
            Some(']') => true,
            Some('}') => false,
            None => return Err(self.end("unclosed range")),
            Some(_) => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidRange,
                    self.pos - 1,
                    "expected ']' or '}' to close range",
                ));
            },
        };

        Ok(QueryValue::range(low, low_inclusive, high, high_inclusive))
    }

    fn read_bound(&mut self) -> Result<Option<QueryValue>, ParseError> {
        match self.peek() {
            None => Err(self.end("unclosed range")),
            Some('"') => Ok(Some(QueryValue::String(self.read_quoted()?))),
            Some(_) => {
                let term = self.read_term()?;
                if term.text.is_empty() {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidRange,
                        self.pos,
                        "expected a range bound",
                    ));
                }
                if term.wildcard {
                    if term.text == "*" {
                        return Ok(None);
                    }
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidRange,
                        term.start,
                        "wildcards are not allowed in range bounds",
                    ));
                }
                match bare_scalar(&term) {
                    QueryValue::Null => Err(ParseError::new(
                        ParseErrorKind::InvalidRange,
                        term.start,
                        "null is not a valid range bound",
                    )),
                    value => Ok(Some(value)),
                }
            },
        }
    }

    fn read_group(&mut self) -> Result<Vec<QueryValue>, ParseError> {
        let open = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(')') {
                break;
            }
            if !items.is_empty() && (self.eat_keyword("OR") || self.eat_symbol("||")) {
                self.skip_ws();
            }
            if self.at_keyword("AND") || self.at_keyword("NOT") || self.at_symbol("&&") {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidValue,
                    self.pos,
                    "only OR may join values in a group",
                ));
            }
            if self.at_keyword("OR") {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedChar,
                    self.pos,
                    "expected a value",
                ));
            }
            items.push(self.read_group_item()?);
        }
        if items.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidValue,
                open,
                "empty value group",
            ));
        }
        Ok(items)
    }

    fn read_group_item(&mut self) -> Result<QueryValue, ParseError> {
        match self.peek() {
            None => Err(self.end("unclosed value group")),
            Some('"') => Ok(QueryValue::String(self.read_quoted()?)),
            Some('(' | '[' | '{') => Err(ParseError::new(
                ParseErrorKind::NonScalarValue,
                self.pos,
                "value groups may only contain scalar values",
            )),
            Some(_) => {
                let term = self.read_term()?;
                if term.text.is_empty() {
                    return Err(self.unexpected_here());
                }
                if term.wildcard {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidValue,
                        term.start,
                        "wildcards are not allowed in value groups",
                    ));
                }
                Ok(bare_scalar(&term))
            },
        }
    }

    /// Read a bare term up to the next unescaped terminator.
    fn read_term(&mut self) -> Result<Term, ParseError> {
        let start = self.pos;
        let mut term = Term {
            text: String::new(),
            start,
            wildcard: false,
            escaped: false,
            escaped_wildcard: false,
        };
        while let Some(c) = self.peek() {
            if is_terminator(c) {
                break;
            }
            self.pos += 1;
            match c {
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(self.end("dangling escape character"));
                    };
                    term.escaped = true;
                    term.escaped_wildcard |= matches!(escaped, '*' | '?');
                    term.text.push(escaped);
                },
                '*' | '?' => {
                    term.wildcard = true;
                    term.text.push(c);
                },
                _ => term.text.push(c),
            }
        }
        Ok(term)
    }

    // =========================================================================
    // Scanner helpers
    // =========================================================================

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.eat(c) {
            return Ok(());
        }
        Err(match self.peek() {
            None => self.end(&format!("expected '{c}'")),
            Some(found) => ParseError::new(
                ParseErrorKind::UnexpectedChar,
                self.pos,
                format!("expected '{c}', found '{found}'"),
            ),
        })
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        symbol
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if self.at_symbol(symbol) {
            self.pos += symbol.chars().count();
            true
        } else {
            false
        }
    }

    /// An upper-case keyword followed by whitespace, `(`, or end of input.
    fn at_keyword(&self, keyword: &str) -> bool {
        self.at_symbol(keyword)
            && self
                .chars
                .get(self.pos + keyword.len())
                .is_none_or(|c| c.is_whitespace() || *c == '(')
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// A one-character prefix operator directly attached to its operand.
    fn eat_prefix(&mut self, c: char) -> bool {
        let attached = self
            .chars
            .get(self.pos + 1)
            .is_some_and(|next| !next.is_whitespace() && *next != '=');
        if self.peek() == Some(c) && attached {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                ParseErrorKind::NestingTooDeep,
                position,
                format!("query nesting exceeds {MAX_NESTING_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn end(&self, message: &str) -> ParseError {
        ParseError::new(ParseErrorKind::UnexpectedEnd, self.pos, message)
    }

    fn unexpected(&self, c: char) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedChar,
            self.pos,
            format!("unexpected '{c}'"),
        )
    }

    fn unexpected_here(&self) -> ParseError {
        match self.peek() {
            Some(c) => self.unexpected(c),
            None => self.end("unexpected end of query"),
        }
    }
}

fn is_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ':')
}

/// Build the comparison for a bare term. A bare word compared with `=` or
/// `!=` ignores case; every other bare value compares exactly.
fn bare_comparison(field: FieldPath, operator: Operator, term: &Term) -> QueryExpression {
    match bare_scalar(term) {
        QueryValue::String(text) if matches!(operator, Operator::Eq | Operator::Ne) => {
            QueryExpression::comparison_ignore_case(field, operator, text)
        },
        value => QueryExpression::comparison(field, operator, value),
    }
}

/// Type a bare (unquoted, wildcard-free) term. Escaped terms stay strings.
fn bare_scalar(term: &Term) -> QueryValue {
    let text = term.text.as_str();
    if term.escaped {
        return QueryValue::String(term.text.clone());
    }
    match text {
        "true" => QueryValue::Bool(true),
        "false" => QueryValue::Bool(false),
        "null" => QueryValue::Null,
        _ if looks_numeric(text) => {
            if let Ok(n) = text.parse::<i64>() {
                QueryValue::Int(n)
            } else if let Ok(n) = text.parse::<f64>()
                && n.is_finite()
            {
                QueryValue::Float(n)
            } else {
                QueryValue::String(term.text.clone())
            }
        },
        _ => QueryValue::String(term.text.clone()),
    }
}

/// Numeric-looking text: sign, digits, `.`, exponent. Rules out `inf`/`NaN`.
fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Comparison, LogicalOp, RangeValue};

    fn cmp(expr: &QueryExpression) -> &Comparison {
        let QueryExpression::Comparison(cmp) = expr else {
            panic!("expected comparison, got {expr:?}")
        };
        cmp
    }

    fn logical(expr: &QueryExpression) -> (LogicalOp, &QueryExpression, Option<&QueryExpression>) {
        let QueryExpression::Logical(l) = expr else {
            panic!("expected logical node, got {expr:?}")
        };
        (l.operator, &l.left, l.right.as_deref())
    }

    // =========================================================================
    // Comparisons
    // =========================================================================

    #[test]
    fn test_bare_word_equality() {
        let expr = parse("status:done").unwrap();
        let c = cmp(&expr);
        assert_eq!(c.field.as_str(), "status");
        assert_eq!(c.operator, Operator::Eq);
        assert_eq!(c.value, QueryValue::String("done".into()));
        assert!(c.case_insensitive);
    }

    #[test]
    fn test_quoted_and_bare_words_differ_in_case_handling() {
        assert_ne!(parse("status:Done").unwrap(), parse(r#"status:"Done""#).unwrap());
        assert!(!cmp(&parse(r#"status:"Done""#).unwrap()).case_insensitive);
        assert!(cmp(&parse("status:=Done").unwrap()).case_insensitive);
        assert!(cmp(&parse("status:!=Done").unwrap()).case_insensitive);
        assert!(cmp(&parse(r"status:\2").unwrap()).case_insensitive);

        // Only string equality folds case
        assert!(!cmp(&parse("status:>Done").unwrap()).case_insensitive);
        assert!(!cmp(&parse("n:2").unwrap()).case_insensitive);
        assert!(!cmp(&parse("name:Do*").unwrap()).case_insensitive);
    }

    #[test]
    fn test_bare_value_typing() {
        assert_eq!(cmp(&parse("a:2").unwrap()).value, QueryValue::Int(2));
        assert_eq!(cmp(&parse("a:-2").unwrap()).value, QueryValue::Int(-2));
        assert_eq!(cmp(&parse("a:2.5").unwrap()).value, QueryValue::Float(2.5));
        assert_eq!(cmp(&parse("a:true").unwrap()).value, QueryValue::Bool(true));
        assert_eq!(cmp(&parse("a:null").unwrap()).value, QueryValue::Null);
        assert_eq!(
            cmp(&parse("a:inf").unwrap()).value,
            QueryValue::String("inf".into())
        );
        assert_eq!(
            cmp(&parse(r"a:\true").unwrap()).value,
            QueryValue::String("true".into())
        );
    }

    #[test]
    fn test_quoted_is_always_string() {
        let expr = parse(r#"a:"2""#).unwrap();
        assert_eq!(cmp(&expr).value, QueryValue::String("2".into()));

        let expr = parse(r#"name:"John \"JD\" Doe""#).unwrap();
        assert_eq!(cmp(&expr).value, QueryValue::String(r#"John "JD" Doe"#.into()));

        // Wildcards inside quotes are literal
        let expr = parse(r#"a:"x*y""#).unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Eq);
    }

    #[test]
    fn test_comparators() {
        let cases = [
            ("a:>1", Operator::Gt),
            ("a:>=1", Operator::Gte),
            ("a:<1", Operator::Lt),
            ("a:<=1", Operator::Lte),
            ("a:=1", Operator::Eq),
            ("a:!=1", Operator::Ne),
        ];
        for (input, op) in cases {
            let expr = parse(input).unwrap();
            assert_eq!(cmp(&expr).operator, op, "input: {input}");
            assert_eq!(cmp(&expr).value, QueryValue::Int(1));
        }
    }

    #[test]
    fn test_wildcard_becomes_like() {
        let expr = parse("name:jo*n?").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Like);
        assert_eq!(cmp(&expr).value, QueryValue::String("jo*n?".into()));

        // Escaped wildcard is a literal equality
        let expr = parse(r"name:jo\*n").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Eq);
        assert_eq!(cmp(&expr).value, QueryValue::String("jo*n".into()));

        // After an explicit operator, wildcards are literal
        let expr = parse("name:=jo*n").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Eq);
    }

    #[test]
    fn test_mixed_escaped_wildcards_rejected() {
        let err = parse(r"name:a\*b*").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidValue);
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_regex() {
        let expr = parse(r"path:/a\/b\d+/").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Regex);
        assert_eq!(cmp(&expr).value, QueryValue::String(r"a/b\d+".into()));

        let err = parse("path:/abc").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedRegex);
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_ranges() {
        let expr = parse("age:[18 TO 65]").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::Between);
        assert_eq!(
            cmp(&expr).value,
            QueryValue::range(Some(QueryValue::Int(18)), true, Some(QueryValue::Int(65)), true)
        );

        let expr = parse(r#"created:{"2024-01-01" TO "2024-12-31"]"#).unwrap();
        let QueryValue::Range(range) = &cmp(&expr).value else {
            panic!("expected range")
        };
        assert!(!range.low_inclusive);
        assert!(range.high_inclusive);

        let expr = parse("price:[* TO 100}").unwrap();
        let QueryValue::Range(range) = &cmp(&expr).value else {
            panic!("expected range")
        };
        assert_eq!(
            **range,
            RangeValue {
                low: None,
                high: Some(QueryValue::Int(100)),
                low_inclusive: true,
                high_inclusive: false,
            }
        );

        let expr = parse("t:[-5 TO -1]").unwrap();
        assert_eq!(
            cmp(&expr).value,
            QueryValue::range(Some(QueryValue::Int(-5)), true, Some(QueryValue::Int(-1)), true)
        );
    }

    #[test]
    fn test_range_errors() {
        assert_eq!(parse("a:[1 2]").unwrap_err().kind, ParseErrorKind::InvalidRange);
        assert_eq!(parse("a:[1 TO 2").unwrap_err().kind, ParseErrorKind::UnexpectedEnd);
        assert_eq!(parse("a:[1 TO 2)").unwrap_err().kind, ParseErrorKind::InvalidRange);
        assert_eq!(parse("a:[a* TO b]").unwrap_err().kind, ParseErrorKind::InvalidRange);
        assert_eq!(parse("a:[null TO 1]").unwrap_err().kind, ParseErrorKind::InvalidRange);
    }

    #[test]
    fn test_value_groups() {
        let expr = parse("status:(open OR pending OR 3)").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::In);
        assert_eq!(
            cmp(&expr).value,
            QueryValue::Array(vec!["open".into(), "pending".into(), QueryValue::Int(3)])
        );

        // Whitespace also separates group members
        let expr = parse(r#"status:("a b" c)"#).unwrap();
        assert_eq!(
            cmp(&expr).value,
            QueryValue::Array(vec!["a b".into(), "c".into()])
        );

        let expr = parse("status:!=(closed OR archived)").unwrap();
        assert_eq!(cmp(&expr).operator, Operator::NotIn);
    }

    #[test]
    fn test_group_rejects_non_scalars() {
        let err = parse("a:(x OR (y OR z))").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NonScalarValue);
        assert_eq!(err.position, 8);

        let err = parse("a:(x OR [1 TO 2])").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NonScalarValue);

        assert_eq!(parse("a:()").unwrap_err().kind, ParseErrorKind::InvalidValue);
        assert_eq!(parse("a:(x AND y)").unwrap_err().kind, ParseErrorKind::InvalidValue);
        assert_eq!(parse("a:(x*)").unwrap_err().kind, ParseErrorKind::InvalidValue);
        assert_eq!(parse("a:>(x)").unwrap_err().kind, ParseErrorKind::InvalidValue);
    }

    #[test]
    fn test_dotted_fields() {
        let expr = parse("users.name:alice").unwrap();
        assert_eq!(cmp(&expr).field.as_str(), "users.name");

        let err = parse("a.b.c:1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidField);
        assert_eq!(err.position, 0);
    }

    // =========================================================================
    // Boolean structure
    // =========================================================================

    #[test]
    fn test_explicit_and() {
        let expr = parse("status:done AND priority:>=2").unwrap();
        let (op, left, right) = logical(&expr);
        assert_eq!(op, LogicalOp::And);
        assert_eq!(cmp(left).field.as_str(), "status");
        let right = cmp(right.unwrap());
        assert_eq!(right.operator, Operator::Gte);
        assert_eq!(right.value, QueryValue::Int(2));
    }

    #[test]
    fn test_implicit_and_equals_explicit() {
        assert_eq!(parse("a:1 b:2 c:3").unwrap(), parse("a:1 AND b:2 AND c:3").unwrap());
        assert_eq!(parse("a:1 && b:2").unwrap(), parse("a:1 AND b:2").unwrap());
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // a OR (b AND c)
        let expr = parse("a:1 OR b:2 c:3").unwrap();
        let (op, left, right) = logical(&expr);
        assert_eq!(op, LogicalOp::Or);
        assert_eq!(cmp(left).field.as_str(), "a");
        assert_eq!(logical(right.unwrap()).0, LogicalOp::And);
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        // (NOT a) AND b
        for input in ["NOT a:1 AND b:2", "-a:1 b:2", "!a:1 b:2"] {
            let expr = parse(input).unwrap();
            let (op, left, _) = logical(&expr);
            assert_eq!(op, LogicalOp::And, "input: {input}");
            let (inner_op, _, inner_right) = logical(left);
            assert_eq!(inner_op, LogicalOp::Not);
            assert!(inner_right.is_none());
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(a:1 OR b:2) AND c:3").unwrap();
        let (op, left, _) = logical(&expr);
        assert_eq!(op, LogicalOp::And);
        assert_eq!(logical(left).0, LogicalOp::Or);
    }

    #[test]
    fn test_plus_prefix_is_noop() {
        assert_eq!(parse("+a:1 +b:2").unwrap(), parse("a:1 b:2").unwrap());
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        // Lower-case `and` is an ordinary term, which lacks a colon here.
        let err = parse("a:1 and b:2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_error_positions() {
        let err = parse("").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyQuery);

        let err = parse("status").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
        assert_eq!(err.position, 6);

        let err = parse("a:1)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar);
        assert_eq!(err.position, 3);

        let err = parse("(a:1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);

        let err = parse(r#"a:"open"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString);
        assert_eq!(err.position, 2);

        let err = parse("a: 1").unwrap_err();
        assert_eq!(err.position, 2);

        let err = parse("a:1 AND").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);

        let err = parse("OR a:1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedChar);
        assert_eq!(err.position, 0);

        let err = parse("na*me:1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidField);
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}a:1{}", "(".repeat(MAX_NESTING_DEPTH), ")".repeat(MAX_NESTING_DEPTH));
        assert!(parse(&ok).is_ok());

        let deep = format!(
            "{}a:1{}",
            "(".repeat(MAX_NESTING_DEPTH + 1),
            ")".repeat(MAX_NESTING_DEPTH + 1)
        );
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep);
        assert_eq!(err.position, MAX_NESTING_DEPTH);

        let nots = format!("{}a:1", "NOT ".repeat(MAX_NESTING_DEPTH + 1));
        assert_eq!(parse(&nots).unwrap_err().kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn test_input_length_limit() {
        let long = format!("a:{}", "x".repeat(MAX_INPUT_LENGTH));
        assert_eq!(parse(&long).unwrap_err().kind, ParseErrorKind::InputTooLong);
    }

    #[test]
    fn test_from_str() {
        let expr: QueryExpression = "a:1".parse().unwrap();
        assert_eq!(expr, parse("a:1").unwrap());
    }

    // =========================================================================
    // Canonical rendering
    // =========================================================================

    #[test]
    fn test_render_then_parse_is_stable() {
        let inputs = [
            "status:done AND priority:>=2",
            "a:1 OR b:2 c:3",
            "NOT (a:1 OR -b:2)",
            "name:jo*n? AND path:/x\\/y/",
            r#"tags:(rust OR "systems programming") age:{18 TO *]"#,
            "s:!=(x OR y) f:2.0 n:null t:false",
            r"name:a\ b* q:\(x\)",
            r#"status:Done s:"Done" s:!=Open s:!="Open""#,
            r"w:\true v:\12 x:a\*b y:\-1",
        ];
        for input in inputs {
            let first = parse(input).unwrap();
            let rendered = first.to_string();
            let second = parse(&rendered)
                .unwrap_or_else(|e| panic!("re-parse of {rendered:?} failed: {e}"));
            assert_eq!(first, second, "input: {input}, rendered: {rendered}");
        }
    }
}
