//! Execution tests: compiled SQLite conditions run against a real database
//! and select the expected rows.

use lql::{
    PipelineError, QueryExpression, QueryPipeline, QueryValue, SecurityOptions, SqlFragment,
    Sqlite, parse,
};
use rusqlite::{Connection, params_from_iter, types::Value};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            priority INTEGER NOT NULL,
            price REAL NOT NULL,
            active INTEGER NOT NULL,
            deleted_at TEXT
        );
        INSERT INTO items VALUES
            (1, 'apple',       'open',    1,  1.5, 1, NULL),
            (2, 'apricot',     'done',    2,  2.5, 0, NULL),
            (3, 'banana',      'done',    3,  3.5, 1, '2024-01-01'),
            (4, '100% cotton', 'open',    4, 10.0, 1, NULL),
            (5, '1000 cotton', 'pending', 5, 20.0, 0, NULL),
            (6, 'snake_case',  'done',    2,  5.0, 1, NULL);",
    )
    .unwrap();
    conn
}

fn pipeline() -> QueryPipeline<Sqlite> {
    QueryPipeline::sqlite(SecurityOptions::new())
}

fn to_sql_value(value: &QueryValue) -> Value {
    match value {
        QueryValue::Null => Value::Null,
        QueryValue::Bool(b) => Value::Integer(i64::from(*b)),
        QueryValue::Int(n) => Value::Integer(*n),
        QueryValue::Float(n) => Value::Real(*n),
        QueryValue::String(s) => Value::Text(s.clone()),
        QueryValue::Array(_) | QueryValue::Range(_) => panic!("unexpanded value {value:?}"),
    }
}

fn run(conn: &Connection, fragment: &SqlFragment) -> Vec<i64> {
    let sql = format!("SELECT id FROM items WHERE {} ORDER BY id", fragment.sql);
    let mut stmt = conn.prepare(&sql).unwrap();
    stmt.query_map(params_from_iter(fragment.params.iter().map(to_sql_value)), |row| {
        row.get(0)
    })
    .unwrap()
    .collect::<Result<Vec<i64>, _>>()
    .unwrap()
}

fn ids(query: &str) -> Vec<i64> {
    let conn = setup();
    let fragment = pipeline().compile(query).unwrap();
    run(&conn, &fragment)
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn test_and_with_ordering() {
    assert_eq!(ids("status:done AND priority:>=2"), vec![2, 3, 6]);
    assert_eq!(ids("status:done priority:<3"), vec![2, 6]);
}

#[test]
fn test_or_and_not() {
    assert_eq!(ids("status:open OR priority:5"), vec![1, 4, 5]);
    assert_eq!(ids("-status:done"), vec![1, 4, 5]);
    assert_eq!(ids("NOT (status:done OR status:open)"), vec![5]);
}

#[test]
fn test_booleans_bind_as_integers() {
    assert_eq!(ids("active:true"), vec![1, 3, 4, 6]);
    assert_eq!(ids("active:false"), vec![2, 5]);
}

#[test]
fn test_null_checks() {
    assert_eq!(ids("deleted_at:null"), vec![1, 2, 4, 5, 6]);
    assert_eq!(ids("deleted_at:!=null"), vec![3]);
}

// =============================================================================
// Lists and ranges
// =============================================================================

#[test]
fn test_in_and_not_in() {
    assert_eq!(ids("status:(open OR pending)"), vec![1, 4, 5]);
    assert_eq!(ids("status:!=(open OR pending)"), vec![2, 3, 6]);
}

#[test]
fn test_ranges() {
    assert_eq!(ids("priority:[2 TO 4}"), vec![2, 3, 6]);
    assert_eq!(ids("price:{3.5 TO *]"), vec![4, 5, 6]);
    assert_eq!(ids("priority:[* TO 1]"), vec![1]);
    assert_eq!(ids("priority:[* TO *]"), vec![1, 2, 3, 4, 5, 6]);
}

// =============================================================================
// Patterns
// =============================================================================

#[test]
fn test_wildcards() {
    assert_eq!(ids("name:ap*"), vec![1, 2]);
    assert_eq!(ids("name:a?ple"), vec![1]);
    assert_eq!(ids("name:*cotton"), vec![4, 5]);
}

#[test]
fn test_literal_percent_and_underscore() {
    // `%` and `_` in the query are literal characters, not SQL wildcards
    assert_eq!(ids("name:100%*"), vec![4]);
    assert_eq!(ids("name:snake_*"), vec![6]);
    assert_eq!(ids("name:snake_case"), vec![6]);
}

#[test]
fn test_collapsed_wildcards_still_match() {
    assert_eq!(ids("name:b***na"), vec![3]);
}

#[test]
fn test_literal_bracket_in_pattern() {
    let conn = setup();
    conn.execute("INSERT INTO items VALUES (7, '[draft] memo', 'open', 1, 1.0, 1, NULL)", [])
        .unwrap();
    let fragment = pipeline().compile(r"name:\[draft\]*").unwrap();
    assert_eq!(run(&conn, &fragment), vec![7]);
}

// =============================================================================
// Case sensitivity
// =============================================================================

fn setup_mixed_case() -> Connection {
    let conn = setup();
    conn.execute_batch(
        "INSERT INTO items VALUES
            (7, 'Apple', 'Done', 9, 1.0, 1, NULL),
            (8, 'APRICOT', 'DONE', 9, 1.0, 1, NULL);",
    )
    .unwrap();
    conn
}

fn mixed_ids(query: &str) -> Vec<i64> {
    let conn = setup_mixed_case();
    let fragment = pipeline().compile(query).unwrap();
    run(&conn, &fragment)
}

#[test]
fn test_bare_words_ignore_case() {
    assert_eq!(mixed_ids("status:done"), vec![2, 3, 6, 7, 8]);
    assert_eq!(mixed_ids("status:DONE"), vec![2, 3, 6, 7, 8]);
    assert_eq!(mixed_ids("status:!=done"), vec![1, 4, 5]);
}

#[test]
fn test_quoted_strings_match_case() {
    assert_eq!(mixed_ids(r#"status:"done""#), vec![2, 3, 6]);
    assert_eq!(mixed_ids(r#"status:"Done""#), vec![7]);
    assert_eq!(mixed_ids(r#"status:!="done""#), vec![1, 4, 5, 7, 8]);
}

#[test]
fn test_like_matches_case() {
    assert_eq!(mixed_ids("name:ap*"), vec![1, 2]);
    assert_eq!(mixed_ids("name:Ap*"), vec![7]);
    assert_eq!(mixed_ids("name:a?ple"), vec![1]);
}

#[test]
fn test_ilike_ignores_case() {
    let conn = setup_mixed_case();
    let fragment = pipeline()
        .compile_json(r#"{"name": {"$ilike": "ap*"}}"#)
        .unwrap();
    assert_eq!(run(&conn, &fragment), vec![1, 2, 7, 8]);
}

// =============================================================================
// Structured input and raw conditions
// =============================================================================

#[test]
fn test_json_filter() {
    let conn = setup();
    let fragment = pipeline()
        .compile_json(r#"{"status": "done", "price": {"$lt": 4}}"#)
        .unwrap();
    assert_eq!(run(&conn, &fragment), vec![2, 3]);

    let fragment = pipeline()
        .compile_json(r#"{"$or": [{"priority": {"$gte": 5}}, {"name": {"$like": "ban*"}}]}"#)
        .unwrap();
    assert_eq!(run(&conn, &fragment), vec![3, 5]);
}

#[test]
fn test_raw_condition() {
    let conn = setup();
    let expr = QueryExpression::and(
        parse("status:done").unwrap(),
        QueryExpression::raw("priority > ?", vec![QueryValue::Int(2)]),
    );
    let fragment = pipeline().compile_expression(expr).unwrap();
    assert_eq!(fragment.sql, "(lower(status) = lower(?1)) AND (priority > ?2)");
    assert_eq!(run(&conn, &fragment), vec![3]);
}

// =============================================================================
// Injection
// =============================================================================

#[test]
fn test_injected_values_are_inert() {
    let conn = setup();
    for query in [
        r#"name:"x' OR '1'='1""#,
        r#"name:"'; DROP TABLE items; --""#,
        r#"status:("done') OR 1=1 --" OR open)"#,
    ] {
        let fragment = pipeline().compile(query).unwrap();
        let rows = run(&conn, &fragment);
        assert!(rows.len() <= 3, "{query} selected {rows:?}");
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 6);
}

#[test]
fn test_injected_field_never_reaches_database() {
    let expr = lql::simple(
        "name; DROP TABLE items; --",
        lql::Operator::Eq,
        QueryValue::from("x"),
    )
    .unwrap();
    let err = pipeline().compile_expression(expr).unwrap_err();
    assert!(matches!(err, PipelineError::Translation(_)));

    let err = pipeline().compile(r"name\;DROP:x").unwrap_err();
    assert!(matches!(err, PipelineError::Translation(_)));
}
