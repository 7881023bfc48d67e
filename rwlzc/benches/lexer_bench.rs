//! Lexer benchmarks using criterion.
//!
//! Run with: cargo bench --bench lexer_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rwlzc::Lexer;

/// A complete RWLZ program.
const LIZARD: &str = include_str!("../demos/lizard.rwlz");

/// A simple expression for micro-benchmarking.
const SIMPLE_EXPR: &str = "1 + 2 * 3 - 4 / 5 % 6";

/// Keywords in mixed case; the language matches them case-insensitively.
const KEYWORDS_SOURCE: &str = r#"
if else while for break continue return print const true false hook
IF Else WHILE For int float bool char string void auto array
"#;

/// Numeric literals.
const NUMERIC_SOURCE: &str = r#"
42 3.14159 0.5 1.0e10 2.5e-3 100 200 300 400 500 600 700 800 900 1000
1.0 2.0 3.0 4.0 5.0 6.0 7.0 8.0 9.0 10.0
"#;

/// Strings, chars and comments.
const STRING_SOURCE: &str = r#"
"hello" "world" "escape\n\t\r" 'a' '\n' '\''
// line comment
/* block
   comment */
"#;

fn lex_to_vec(source: &str) -> Vec<rwlzc::TokenKind> {
    Lexer::new(source).map(|t| t.kind).collect()
}

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    let inputs = [
        ("lizard.rwlz", LIZARD),
        ("simple_expr", SIMPLE_EXPR),
        ("keywords", KEYWORDS_SOURCE),
        ("numeric", NUMERIC_SOURCE),
        ("strings_comments", STRING_SOURCE),
    ];
    for (name, source) in inputs {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new(name, source.len()), source, |b, source| {
            b.iter(|| lex_to_vec(black_box(source)));
        });
    }

    group.finish();
}

fn bench_lexer_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_scaling");

    for size in [1, 2, 4, 8, 16] {
        let source = LIZARD.repeat(size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("lizard_repeated", size),
            &source,
            |b, source| {
                b.iter(|| lex_to_vec(black_box(source)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_lexer, bench_lexer_scaling);
criterion_main!(benches);
