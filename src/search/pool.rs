//! Bounded worker pool the search engine fans batches out to (spec §4.10).
//!
//! A thin wrapper over a dedicated `rayon::ThreadPool` so the engine never
//! borrows threads from (or contends with) the process-global rayon pool
//! used elsewhere.

use crate::error::{Error, Result};
use rayon::ThreadPool;

/// Dedicated thread pool sized at construction and reused across searches.
pub struct SearchPool {
    pool: ThreadPool,
}

impl SearchPool {
    /// Builds a pool with `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pool fails to start (e.g. `workers == 0`).
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("vittoria-search-{i}"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Runs `f` on this pool, blocking the caller until it completes.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn install_runs_on_dedicated_threads() {
        let pool = SearchPool::new(2).unwrap();
        let sum: i32 = pool.install(|| (0..100).into_par_iter().sum());
        assert_eq!(sum, 4950);
    }
}
