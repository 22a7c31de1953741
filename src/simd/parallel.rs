//! Parallel execution mode: vectorized batches fanned out across a bounded
//! worker pool. The pool size is the semaphore: rayon never runs more than
//! `workers` batches concurrently because the pool itself has `workers`
//! threads.

use super::vectorized::cosine_vectorized;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Computes cosine similarity of `query` against every row of `vectors` by
/// splitting `vectors` into chunks of `chunk_size` and scoring each chunk on
/// a worker pool of `workers` threads. Falls back to building a pool
/// lazily per call; callers driving many queries should prefer the search
/// engine's persistent pool ([`crate::search::WorkerPool`]) instead.
#[must_use]
pub fn cosine_batch_parallel(
    query: &[f32],
    vectors: &[&[f32]],
    workers: usize,
    chunk_size: usize,
) -> Vec<f32> {
    let workers = workers.max(1);
    let chunk_size = chunk_size.max(1);

    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("failed to build rayon thread pool");

    pool.install(|| {
        vectors
            .par_chunks(chunk_size)
            .flat_map(|chunk| {
                chunk
                    .iter()
                    .map(|v| {
                        if v.len() != query.len() {
                            0.0
                        } else {
                            cosine_vectorized(query, v)
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    })
}
