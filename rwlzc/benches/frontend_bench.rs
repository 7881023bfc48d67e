//! Front-end benchmarks: parsing, analysis and IR generation.
//!
//! Run with: cargo bench --bench frontend_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rwlzc::codegen::generate;
use rwlzc::config::{CodegenConfig, CompilerConfig};
use rwlzc::typeck::check_program;
use rwlzc::Parser;

const LIZARD: &str = include_str!("../demos/lizard.rwlz");

/// `count` copies of a small function with distinct names.
fn many_functions(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        source.push_str(&format!(
            "int step{i}(int n) {{ int total = 0; for (int k = 0; k < n; k++) {{ total += k * {i}; }} return total; }}\n"
        ));
    }
    source.push_str("int main() { return step0(3); }\n");
    source
}

fn bench_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("frontend");
    group.throughput(Throughput::Bytes(LIZARD.len() as u64));

    group.bench_function("parse", |b| {
        b.iter(|| Parser::new(black_box(LIZARD)).parse_program())
    });

    let program = Parser::new(LIZARD)
        .parse_program()
        .expect("demo program parses");
    group.bench_function("analyze", |b| b.iter(|| check_program(black_box(&program))));

    let config = CodegenConfig::default();
    group.bench_function("generate", |b| {
        b.iter(|| generate(black_box(&program), &config))
    });

    group.bench_function("render_ir", |b| {
        let module = generate(&program, &config).expect("demo program lowers");
        b.iter(|| black_box(&module).to_string())
    });

    group.finish();
}

fn bench_pipeline_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_scaling");
    let config = CompilerConfig::default();

    for count in [10, 100, 1000] {
        let source = many_functions(count);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("compile", count), &source, |b, source| {
            b.iter(|| rwlzc::compile(black_box(source), &config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_phases, bench_pipeline_scaling);
criterion_main!(benches);
