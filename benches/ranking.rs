use criterion::{Criterion, criterion_group, criterion_main};
use professor_rag::retrieval::{DEFAULT_RESULT_LIMIT, DEFAULT_SIMILARITY_THRESHOLD, rank};
use std::hint::black_box;

const DIMENSION: usize = 768;
const ENTRIES: usize = 2_000;

/// Deterministic pseudo-random vectors so runs are comparable
fn vectors(count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            (0..DIMENSION)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    ((state >> 33) as f32 / u32::MAX as f32) - 0.25
                })
                .collect()
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let knowledge = vectors(ENTRIES, 7);
    let query = vectors(1, 42).remove(0);

    c.bench_function("rank_2000x768", |b| {
        b.iter(|| {
            rank(
                black_box(&query),
                knowledge.iter().enumerate(),
                DEFAULT_SIMILARITY_THRESHOLD,
                DEFAULT_RESULT_LIMIT,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
