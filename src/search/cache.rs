//! LRU + TTL result cache for the parallel search engine (spec §4.10).
//!
//! Structurally the same O(1) `IndexMap`-based LRU as the storage buffer
//! cache, plus a TTL check on read and a background sweep that reclaims
//! entries nobody will ever read again.

use super::stats::SearchCacheStats;
use crate::vector::SearchResponse;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
    response: SearchResponse,
    inserted_at: Instant,
    last_accessed: Instant,
}

/// Thread-safe cache of search responses keyed by request fingerprint.
pub struct SearchCache {
    capacity: usize,
    ttl: Duration,
    inner: RwLock<IndexMap<u64, Entry>>,
    evictions: AtomicU64,
    cleanup_runs: AtomicU64,
}

impl SearchCache {
    /// Creates a cache holding at most `capacity` live entries, each
    /// valid for `ttl` after insertion.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            inner: RwLock::new(IndexMap::with_capacity(capacity.min(1024))),
            evictions: AtomicU64::new(0),
            cleanup_runs: AtomicU64::new(0),
        }
    }

    /// Looks up `fingerprint`. An expired entry is treated as a miss and
    /// removed on the spot.
    pub fn get(&self, fingerprint: u64) -> Option<SearchResponse> {
        let mut inner = self.inner.write();
        let entry = inner.get(&fingerprint)?;
        if entry.inserted_at.elapsed() > self.ttl {
            inner.shift_remove(&fingerprint);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let response = entry.response.clone();
        let inserted_at = entry.inserted_at;
        // Move to back (most recently used); `inserted_at` is preserved so
        // TTL expiry is measured from insertion, not last access.
        inner.shift_remove(&fingerprint);
        inner.insert(
            fingerprint,
            Entry {
                response: response.clone(),
                inserted_at,
                last_accessed: Instant::now(),
            },
        );
        Some(response)
    }

    /// Inserts `response` under `fingerprint`, evicting the LRU entry if
    /// the cache is at capacity.
    pub fn insert(&self, fingerprint: u64, response: SearchResponse) {
        let mut inner = self.inner.write();
        inner.shift_remove(&fingerprint);
        if inner.len() >= self.capacity {
            if inner.shift_remove_index(0).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        let now = Instant::now();
        inner.insert(
            fingerprint,
            Entry {
                response,
                inserted_at: now,
                last_accessed: now,
            },
        );
    }

    /// Drops every entry. Called whenever the owning collection's data
    /// changes, so future hits always reflect current state.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.write();
        self.evictions
            .fetch_add(inner.len() as u64, Ordering::Relaxed);
        inner.clear();
    }

    /// Removes every entry older than `ttl`. Intended to be driven by a
    /// periodic background task (see [`spawn_cleanup`]).
    pub fn sweep_expired(&self) {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        let removed = before - inner.len();
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Current size and lifetime eviction/cleanup counters.
    #[must_use]
    pub fn stats(&self) -> SearchCacheStats {
        SearchCacheStats {
            entries: self.inner.read().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            cleanup_runs: self.cleanup_runs.load(Ordering::Relaxed),
        }
    }
}

/// Spawns a background task that calls [`SearchCache::sweep_expired`]
/// every `interval`. Aborts the returned handle to stop it.
pub fn spawn_cleanup(cache: Arc<SearchCache>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            cache.sweep_expired();
        }
    })
}
