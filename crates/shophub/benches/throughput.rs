//! Benchmarks for shophub query cache and store operations

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use shophub::prelude::*;
use shophub::CatalogConfig;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_service() -> ProductService<ProductRepository> {
    let repository = ProductRepository::demo(CatalogConfig::instant());
    ProductService::new(QueryClient::new(), Arc::new(repository), 12)
}

fn bench_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = &create_service();

    // Pre-populate
    rt.block_on(async {
        service.product(1).await.unwrap();
    });

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(1));

    group.bench_function("detail_hit", |b| {
        b.to_async(&rt).iter(|| async move {
            let result = service.product(black_box(1)).await.unwrap();
            black_box(result);
        });
    });

    group.bench_function("detail_miss", |b| {
        b.to_async(&rt).iter(|| async move {
            service.client().remove(&ProductKeys::detail(2));
            let result = service.product(black_box(2)).await.unwrap();
            black_box(result);
        });
    });

    group.finish();
}

fn bench_paging(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = &create_service();

    let mut group = c.benchmark_group("paging");
    group.throughput(Throughput::Elements(5));

    group.bench_function("whole_catalog", |b| {
        b.to_async(&rt).iter(|| async move {
            service.client().clear();
            let query = service
                .infinite_products(ProductFilters::default())
                .await
                .unwrap();
            while query.fetch_next_page().await.unwrap() {}
            black_box(query.items().unwrap().len());
        });
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let products = ProductRepository::demo(CatalogConfig::instant())
        .products()
        .to_vec();
    let store = Store::create();
    for product in products.iter().take(10) {
        store.add_to_cart(product.clone());
    }

    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(100));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0usize;
        b.iter(|| {
            for _ in 0..100 {
                i = i.wrapping_add(1);
                if i % 5 == 0 {
                    // 20% writes
                    store.add_to_cart(products[i % products.len()].clone());
                    store.remove_from_cart(products[i % products.len()].id);
                } else {
                    // 80% memoized reads
                    black_box(store.cart_total());
                    black_box(store.cart_item_count());
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_query, bench_paging, bench_store);
criterion_main!(benches);
