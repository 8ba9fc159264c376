#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::similar_names
)]
use std::collections::HashMap;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dynhash::{ExtendibleHashMap, LinearHashMap};
use proptest::{
    prelude::{Strategy, any, prop},
    strategy::ValueTree,
    test_runner::TestRunner,
};

const ITEMS_AMOUNT: usize = 1000;
const SAMPLE_SIZE: usize = 10;

fn hash_index_benches(c: &mut Criterion) {
    let mut runner = TestRunner::default();
    let items = prop::collection::vec((any::<u64>(), any::<u64>()), ITEMS_AMOUNT)
        .new_tree(&mut runner)
        .unwrap()
        .current();

    let mut group = c.benchmark_group("Dynamic hashing comparison benchmark");
    group.sample_size(SAMPLE_SIZE);
    let mut extendible_map = ExtendibleHashMap::new();
    let mut linear_map = LinearHashMap::new();
    let mut rust_map = HashMap::new();
    group.bench_function("extendible insert", |b| {
        b.iter(|| {
            for &(key, value) in &items {
                extendible_map.insert(key, value).unwrap();
            }
        });
    });
    group.bench_function("linear insert", |b| {
        b.iter(|| {
            for &(key, value) in &items {
                linear_map.insert(key, value);
            }
        });
    });
    group.bench_function("rust std insert", |b| {
        b.iter(|| {
            for &(key, value) in &items {
                rust_map.insert(key, value);
            }
        });
    });
    group.bench_function("extendible get", |b| {
        b.iter(|| {
            for (key, _) in &items {
                black_box(extendible_map.get(key));
            }
        });
    });
    group.bench_function("linear get", |b| {
        b.iter(|| {
            for (key, _) in &items {
                black_box(linear_map.get(key));
            }
        });
    });
    group.bench_function("rust std get", |b| {
        b.iter(|| {
            for (key, _) in &items {
                black_box(rust_map.get(key));
            }
        });
    });
    group.finish();
}

fn growth_benches(c: &mut Criterion) {
    let mut runner = TestRunner::default();
    let keys = prop::collection::vec(any::<u32>(), ITEMS_AMOUNT)
        .new_tree(&mut runner)
        .unwrap()
        .current();

    let mut group = c.benchmark_group("Growth from empty");
    group.sample_size(SAMPLE_SIZE);
    group.bench_function("extendible", |b| {
        b.iter(|| {
            let mut map = ExtendibleHashMap::new();
            for &key in &keys {
                map.insert(key, key).unwrap();
            }
            map
        });
    });
    group.bench_function("linear", |b| {
        b.iter(|| keys.iter().map(|&key| (key, key)).collect::<LinearHashMap<_, _>>());
    });
    group.finish();
}

criterion_group!(benches, hash_index_benches, growth_benches);

criterion_main!(benches);
