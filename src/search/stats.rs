//! Counters exposed by the parallel search engine and its result cache.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative search engine counters (spec §4.10 step 5).
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Total search requests served (cache hits and misses).
    pub total_searches: u64,
    /// Requests answered from the result cache.
    pub cache_hits: u64,
    /// Requests that missed the cache and reached the index.
    pub cache_misses: u64,
    /// Requests served by the parallel batch-fan-out path.
    pub parallel_count: u64,
    /// Requests served by the sequential path.
    pub sequential_count: u64,
    /// Rolling average latency across all served requests, in milliseconds.
    pub avg_latency_ms: f64,
    /// Worker count the engine is currently configured with.
    pub workers: usize,
}

#[derive(Debug, Default)]
pub(super) struct AtomicSearchStats {
    total_searches: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    parallel_count: AtomicU64,
    sequential_count: AtomicU64,
    latency_sum_micros: AtomicU64,
}

impl AtomicSearchStats {
    pub(super) fn record_hit(&self) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_miss(&self, parallel: bool, latency_micros: u64) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        if parallel {
            self.parallel_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sequential_count.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_micros
            .fetch_add(latency_micros, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self, workers: usize) -> SearchStats {
        let total = self.total_searches.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let latency_sum = self.latency_sum_micros.load(Ordering::Relaxed);
        let avg_latency_ms = if misses == 0 {
            0.0
        } else {
            (latency_sum as f64 / misses as f64) / 1000.0
        };
        SearchStats {
            total_searches: total,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: misses,
            parallel_count: self.parallel_count.load(Ordering::Relaxed),
            sequential_count: self.sequential_count.load(Ordering::Relaxed),
            avg_latency_ms,
            workers,
        }
    }
}

/// Result-cache counters (spec §4.10 cache lifecycle).
#[derive(Debug, Clone, Default)]
pub struct SearchCacheStats {
    /// Entries currently live in the cache.
    pub entries: usize,
    /// Entries evicted for capacity or expired out by a cleanup sweep.
    pub evictions: u64,
    /// Number of cleanup sweeps that have run.
    pub cleanup_runs: u64,
}
