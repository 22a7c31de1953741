//! Three interchangeable execution modes for the distance kernels in
//! [`crate::distance`]: scalar, vectorized (8-wide unrolled via `wide`), and
//! parallel (vectorized batches fanned out to a worker pool bounded by a
//! semaphore). All three must agree to within 1e-3 relative error on the
//! same inputs; CPU-feature detection stays inside this module and never
//! leaks to callers, who only see [`ExecutionMode`].

mod parallel;
mod scalar;
mod vectorized;

pub use parallel::cosine_batch_parallel;
pub use scalar::cosine_batch_scalar;
pub use vectorized::cosine_batch_vectorized;

use crate::config::ExecutionMode;

/// Computes cosine similarity of `query` against every row of `vectors`
/// using the requested execution mode. `workers`/`chunk_size` only matter
/// for [`ExecutionMode::Parallel`].
#[must_use]
pub fn cosine_batch(
    query: &[f32],
    vectors: &[&[f32]],
    mode: ExecutionMode,
    workers: usize,
    chunk_size: usize,
) -> Vec<f32> {
    match mode {
        ExecutionMode::Scalar => cosine_batch_scalar(query, vectors),
        ExecutionMode::Vectorized => cosine_batch_vectorized(query, vectors),
        ExecutionMode::Parallel => cosine_batch_parallel(query, vectors, workers, chunk_size),
    }
}
