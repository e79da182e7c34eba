//! Benchmarks for token resolution.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use edgerelay_auth::{TokenDocument, TokenRow};
use time::OffsetDateTime;

fn document(size: usize) -> TokenDocument {
    TokenDocument::from_rows((0..size).map(|i| {
        if i % 2 == 0 {
            TokenRow::permanent(format!("token-{i}"))
        } else {
            TokenRow::expiring(format!("token-{i}"), "2030-01-01T00:00:00Z")
        }
    }))
}

fn bench_resolve(c: &mut Criterion) {
    let now = OffsetDateTime::now_utc();
    let mut group = c.benchmark_group("resolve");
    for size in [10, 100, 1000] {
        let doc = document(size);
        let last = format!("token-{}", size - 1);
        group.bench_with_input(BenchmarkId::new("hit_last", size), &last, |b, t| {
            b.iter(|| doc.resolve(black_box(t), now))
        });
        group.bench_with_input(BenchmarkId::new("miss", size), "absent", |b, t| {
            b.iter(|| doc.resolve(black_box(t), now))
        });
    }
    group.finish();
}

fn bench_parse_document(c: &mut Criterion) {
    let json = serde_json::to_vec(&document(100)).unwrap();
    c.bench_function("parse_document_100", |b| {
        b.iter(|| TokenDocument::from_json(black_box(&json)))
    });
}

criterion_group!(benches, bench_resolve, bench_parse_document);
criterion_main!(benches);
