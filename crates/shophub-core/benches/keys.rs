//! Benchmarks for query key construction, hashing and prefix matching

use criterion::{Criterion, criterion_group, criterion_main};
use shophub_core::{ProductFilters, ProductKeys, QueryKey};
use std::collections::HashMap;
use std::hint::black_box;

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    group.bench_function("detail", |b| {
        b.iter(|| ProductKeys::detail(black_box(42)));
    });

    group.bench_function("infinite_with_filters", |b| {
        b.iter(|| {
            ProductKeys::infinite(ProductFilters::new(
                black_box("electronics"),
                black_box("pro"),
            ))
        });
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut map: HashMap<QueryKey, u64> = HashMap::new();
    for id in 0..1_000u64 {
        map.insert(ProductKeys::detail(id), id);
    }
    let key = ProductKeys::detail(512);

    c.bench_function("hash_lookup", |b| {
        b.iter(|| map.get(black_box(&key)));
    });

    let prefix = ProductKeys::details();
    c.bench_function("prefix_scan_1000", |b| {
        b.iter(|| map.keys().filter(|k| k.starts_with(black_box(&prefix))).count());
    });

    c.bench_function("display", |b| {
        b.iter(|| black_box(&key).to_string());
    });
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
