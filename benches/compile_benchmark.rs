//! Benchmarks for filter list parsing and compilation.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dnrc::compiler::merge;
use dnrc::converter::{classify_line, parse_list};
use dnrc::{compile_list, compile_lists, Limits};

/// Generate an EasyList-style list with a realistic mix of line shapes.
fn generate_list(lines: usize, seed: usize) -> String {
    let mut text = String::with_capacity(lines * 32);
    text.push_str("[Adblock Plus 2.0]\n! Title: Generated\n");

    for i in 0..lines {
        let n = i + seed * lines;
        let line = match i % 8 {
            0 => format!("||ads{}.example.com^", n),
            1 => format!("||tracker{}.example.net^$third-party", n),
            2 => format!("/ads/banner{}.gif$image", n),
            3 => format!("||cdn{}.example.org/promo/*", n),
            4 => format!("||static{}.example.com/assets/collect", n),
            5 => format!("##.ad-slot-{}", n % 500),
            6 => format!("@@||good{}.example.com^", n),
            _ => format!("example{}.com##.sponsored", n),
        };
        text.push_str(&line);
        text.push('\n');
    }

    text
}

fn bench_classify_line(c: &mut Criterion) {
    let lines = [
        "||doubleclick.net^",
        "/ads/banner.gif$image,third-party",
        "||example.com/path/to/tracker.js",
        "##.ad-banner",
        "@@||example.com^$document",
        "example.com#?#div:has(> .ad)",
    ];

    let mut group = c.benchmark_group("classify_line");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("mixed_shapes", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(classify_line(line));
            }
        })
    });
    group.finish();
}

fn bench_parse_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_list");

    for size in [1_000, 10_000, 50_000].iter() {
        let text = generate_list(*size, 0);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("lines", size), &text, |b, text| {
            b.iter(|| black_box(parse_list(text, 5_000)))
        });
    }

    group.finish();
}

fn bench_compile_list(c: &mut Criterion) {
    let text = generate_list(80_000, 0);
    let limits = Limits::default();

    c.bench_function("compile_list_80k", |b| {
        b.iter(|| black_box(compile_list(&text, &limits)))
    });
}

fn bench_merge(c: &mut Criterion) {
    let texts: Vec<String> = (0..3).map(|seed| generate_list(20_000, seed)).collect();
    let limits = Limits::default();

    let mut group = c.benchmark_group("merge");
    group.bench_function("compile_lists_3x20k", |b| {
        b.iter(|| black_box(compile_lists(texts.as_slice(), &limits)))
    });

    // Merge only, lists already compiled per source
    let compiled: Vec<_> = texts
        .iter()
        .map(|text| dnrc::compiler::compile_parsed(parse_list(text, 5_000), &limits))
        .collect();
    group.bench_function("merge_precompiled_3x20k", |b| {
        b.iter_batched(
            || compiled.clone(),
            |lists| black_box(merge(lists, &limits)),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_classify_line,
    bench_parse_list,
    bench_compile_list,
    bench_merge,
);

criterion_main!(benches);
