use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use std::collections::HashSet;
use std::hint::black_box;

use semquote::index::SearchIndex;
use semquote::search::search_by_vector;

const ITEMS: usize = 10_000;
const DIM: usize = 1024;

/// Synthetic corpus of random quantized vectors, sized like the shipped
/// quotes collection.
fn synthetic_index() -> SearchIndex<usize> {
    let mut rng = rand::rng();
    let buffer: Vec<u8> = (0..ITEMS * DIM)
        .map(|_| rng.random_range(-127i8..=127) as u8)
        .collect();
    let metadata = (0..ITEMS).collect();
    SearchIndex::assemble(metadata, vec![buffer], DIM).expect("valid synthetic index")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let index = synthetic_index();
    let mut rng = rand::rng();
    let query: Vec<i8> = (0..DIM).map(|_| rng.random_range(-127i8..=127)).collect();
    let exclude = HashSet::new();

    c.bench_function("search_by_vector_10k", |b| {
        b.iter(|| {
            search_by_vector(
                black_box(&index),
                black_box(&query),
                black_box(10),
                black_box(&exclude),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
