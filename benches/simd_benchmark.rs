//! Distance-kernel execution-mode comparison.
//!
//! Run with: `cargo bench --bench simd_benchmark`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vittoriadb_core::simd::cosine_batch;
use vittoriadb_core::config::ExecutionMode;

fn generate_vector(dim: usize, seed: u64) -> Vec<f32> {
    (0..dim)
        .map(|i| ((seed as f32 * 0.1 + i as f32 * 0.01).sin() + 1.0) / 2.0)
        .collect()
}

fn bench_cosine_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_batch");
    let dim = 768;
    let query = generate_vector(dim, 0);
    let vectors: Vec<Vec<f32>> = (0..1000).map(|i| generate_vector(dim, i)).collect();
    let refs: Vec<&[f32]> = vectors.iter().map(Vec::as_slice).collect();

    group.throughput(Throughput::Elements(refs.len() as u64));

    for mode in [ExecutionMode::Scalar, ExecutionMode::Vectorized, ExecutionMode::Parallel] {
        group.bench_with_input(BenchmarkId::new("mode", format!("{mode:?}")), &mode, |b, &mode| {
            b.iter(|| black_box(cosine_batch(&query, &refs, mode, 4, 64)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cosine_batch);
criterion_main!(benches);
