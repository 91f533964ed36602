//! Benchmarks for parsing, validation, and translation.
//!
//! Run with: cargo bench -p lql

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lql::translate::is_valid_identifier;
use lql::{Postgres, SecurityOptions, SecurityValidator, SqlTranslator, parse, parse_json, postgres};
use std::hint::black_box;

const QUERIES: [(&str, &str); 4] = [
    ("single", "status:done"),
    ("and", "status:done AND priority:>=2"),
    (
        "mixed",
        "(status:(open OR pending) OR priority:[1 TO 3]) -archived:true name:jo*",
    ),
    (
        "wide",
        "a:1 b:2 c:3 d:4 e:5 f:6 g:7 h:8 i:9 j:10 k:11 l:12 m:13 n:14 o:15 p:16",
    ),
];

// =============================================================================
// Parser Benchmarks
// =============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::new("lql", name), query, |b, q| {
            b.iter(|| parse(black_box(q)))
        });
    }

    let json = r#"{"status": {"$in": ["open", "pending"]}, "age": {"$between": [18, 65]}}"#;
    group.bench_function("json", |b| b.iter(|| parse_json(black_box(json))));

    group.finish();
}

// =============================================================================
// Validation Benchmarks
// =============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let validator = SecurityValidator::new(
        SecurityOptions::new().allow_fields(&["status", "priority", "archived", "name"]),
    );

    for (name, query) in QUERIES.iter().take(3) {
        let Ok(expr) = parse(query) else { continue };
        group.bench_with_input(BenchmarkId::new("check", name), &expr, |b, e| {
            b.iter(|| validator.check(black_box(e), None))
        });
    }

    group.bench_function("identifier", |b| {
        b.iter(|| is_valid_identifier(black_box("users.created_at")))
    });

    group.finish();
}

// =============================================================================
// Translation Benchmarks
// =============================================================================

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    let translator = SqlTranslator::new(Postgres);

    for (name, query) in QUERIES {
        let Ok(expr) = parse(query) else { continue };
        group.bench_with_input(BenchmarkId::new("postgres", name), &expr, |b, e| {
            b.iter(|| translator.translate(black_box(e)))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = postgres(SecurityOptions::new());
    c.bench_function("pipeline/compile", |b| {
        b.iter(|| pipeline.compile(black_box("status:done AND priority:>=2 name:jo*")))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_validate,
    bench_translate,
    bench_pipeline
);
criterion_main!(benches);
