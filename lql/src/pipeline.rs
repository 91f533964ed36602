//! Parse, validate, then translate.
//!
//! The translator only ever sees trees that passed validation, and the first
//! failing stage aborts the compile.

use crate::ast::QueryExpression;
use crate::dialect::{Dialect, Postgres, Sqlite};
use crate::parser::{ParseError, parse, parse_json};
use crate::translate::{SqlFragment, SqlTranslator, TranslationError};
use crate::validate::{SchemaFields, SecurityError, SecurityOptions, SecurityValidator};
use thiserror::Error;
use tracing::{debug, warn};

/// The first stage failure of a compile.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Malformed query syntax.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Query rejected by policy.
    #[error(transparent)]
    Security(#[from] SecurityError),
    /// Tree could not be turned into safe SQL.
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl PipelineError {
    /// Whether the caller's query is at fault, as opposed to the server.
    ///
    /// Every stage error is a rejected query.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Parse(_) | Self::Security(_) | Self::Translation(_) => true,
        }
    }

    /// Stable error code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "invalid_query",
            Self::Security(_) => "query_rejected",
            Self::Translation(_) => "untranslatable_query",
        }
    }
}

/// A reusable query compiler for one dialect.
///
/// Holds no per-query state, so one pipeline can serve concurrent requests.
///
/// # Example
///
/// ```
/// use lql::{Postgres, QueryPipeline, SecurityOptions, SqlTranslator};
///
/// let pipeline = QueryPipeline::postgres(SecurityOptions::new());
/// let fragment = pipeline.compile("status:done AND priority:>=2").unwrap();
/// assert_eq!(fragment.sql, "(lower(status) = lower($1)) AND (priority >= $2)");
///
/// let exact = SqlTranslator::new(Postgres).fold_case(false);
/// let pipeline = QueryPipeline::new(SecurityOptions::new(), exact);
/// let fragment = pipeline.compile("status:done AND priority:>=2").unwrap();
/// assert_eq!(fragment.sql, "(status = $1) AND (priority >= $2)");
/// ```
#[derive(Debug, Clone)]
pub struct QueryPipeline<D: Dialect> {
    validator: SecurityValidator,
    schema: Option<SchemaFields>,
    translator: SqlTranslator<D>,
}

impl QueryPipeline<Postgres> {
    /// Pipeline targeting Postgres.
    #[must_use]
    pub const fn postgres(options: SecurityOptions) -> Self {
        Self::new(options, SqlTranslator::new(Postgres))
    }
}

impl QueryPipeline<Sqlite> {
    /// Pipeline targeting `SQLite`.
    #[must_use]
    pub const fn sqlite(options: SecurityOptions) -> Self {
        Self::new(options, SqlTranslator::new(Sqlite))
    }
}

impl<D: Dialect> QueryPipeline<D> {
    /// Create a pipeline from options and a configured translator.
    #[must_use]
    pub const fn new(options: SecurityOptions, translator: SqlTranslator<D>) -> Self {
        Self {
            validator: SecurityValidator::new(options),
            schema: None,
            translator,
        }
    }

    /// Derive the field allow set from `schema` when no explicit allow list
    /// is configured.
    #[must_use]
    pub fn schema(mut self, schema: SchemaFields) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The enforced options.
    #[must_use]
    pub const fn options(&self) -> &SecurityOptions {
        self.validator.options()
    }

    /// The translator.
    #[must_use]
    pub const fn translator(&self) -> &SqlTranslator<D> {
        &self.translator
    }

    /// Compile an LQL query.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub fn compile(&self, query: &str) -> Result<SqlFragment, PipelineError> {
        self.compile_expression(parse(query)?)
    }

    /// Compile a Mongo-style JSON filter.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub fn compile_json(&self, json: &str) -> Result<SqlFragment, PipelineError> {
        self.compile_expression(parse_json(json)?)
    }

    /// Validate and translate an already-built tree.
    ///
    /// # Errors
    ///
    /// Returns a security or translation failure.
    pub fn compile_expression(&self, expr: QueryExpression) -> Result<SqlFragment, PipelineError> {
        debug!(
            clauses = expr.count_clauses(),
            depth = expr.depth(),
            "query parsed"
        );

        let expr = self
            .validator
            .validate(expr, self.schema.as_ref())
            .inspect_err(|err| warn!(category = %err.category, "query rejected"))?;

        let fragment = self.translator.translate(&expr)?;
        debug!(
            dialect = self.translator.dialect().name(),
            params = fragment.params.len(),
            "query translated"
        );
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseErrorKind;
    use crate::validate::SecurityCategory;
    use crate::{Operator, QueryValue};

    #[test]
    fn test_compile_lql() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new());
        let fragment = pipeline.compile("status:done AND priority:>=2").unwrap();
        assert_eq!(fragment.sql, "(lower(status) = lower($1)) AND (priority >= $2)");
        assert_eq!(
            fragment.params,
            vec![QueryValue::from("done"), QueryValue::Int(2)]
        );
    }

    #[test]
    fn test_compile_json() {
        let pipeline = QueryPipeline::sqlite(SecurityOptions::new());
        let fragment = pipeline
            .compile_json(r#"{"age": {"$gte": 18}, "status": {"$in": ["a", "b"]}}"#)
            .unwrap();
        assert_eq!(fragment.sql, "(age >= ?1) AND (status IN (?2, ?3))");
        assert_eq!(fragment.params.len(), 3);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new());
        let Err(PipelineError::Parse(err)) = pipeline.compile("status:(done") else {
            panic!("expected parse error");
        };
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
    }

    #[test]
    fn test_object_value_rejected_at_parse() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new());
        let err = pipeline
            .compile_json(r#"{"name": {"first": "x"}}"#)
            .unwrap_err();
        let PipelineError::Parse(parse) = &err else {
            panic!("expected parse error, got {err:?}");
        };
        assert_eq!(parse.kind, ParseErrorKind::NonScalarValue);
        assert_eq!(err.code(), "invalid_query");
    }

    #[test]
    fn test_security_rejection_stops_pipeline() {
        let pipeline =
            QueryPipeline::postgres(SecurityOptions::new().allow_fields(&["name", "status"]));
        let Err(PipelineError::Security(err)) = pipeline.compile("password:secret") else {
            panic!("expected security error");
        };
        assert_eq!(err.category, SecurityCategory::FieldAccess);
    }

    #[test]
    fn test_regex_denied_by_default() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new());
        let Err(PipelineError::Security(err)) = pipeline.compile("path:/^a/") else {
            panic!("expected security error");
        };
        assert_eq!(err.category, SecurityCategory::OperatorDenied);

        let pipeline = QueryPipeline::postgres(SecurityOptions::new().deny_operators(&[]));
        assert_eq!(pipeline.compile("path:/^a/").unwrap().sql, "path ~ $1");
    }

    #[test]
    fn test_translation_error_surfaces() {
        let pipeline = QueryPipeline::sqlite(SecurityOptions::new().deny_operators(&[]));
        let err = pipeline.compile("path:/^a/").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Translation(TranslationError::UnsupportedOperator {
                operator: Operator::Regex,
                ..
            })
        ));
        assert_eq!(err.code(), "untranslatable_query");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_sanitized_before_translation() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new());
        let fragment = pipeline.compile("name:jo***n").unwrap();
        assert_eq!(fragment.params, vec![QueryValue::from("jo%n")]);
    }

    #[test]
    fn test_schema_allow_set() {
        let pipeline = QueryPipeline::postgres(SecurityOptions::new())
            .schema(SchemaFields::new().table("users", &[("name", "text"), ("age", "int")]));
        assert!(pipeline.compile("name:x users.age:>3").is_ok());
        assert!(matches!(
            pipeline.compile("email:x"),
            Err(PipelineError::Security(_))
        ));
    }
}
