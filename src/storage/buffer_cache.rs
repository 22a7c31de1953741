//! Thread-safe LRU cache over pages, keyed by page id.

use super::page::Page;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache hit/miss/eviction counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted to make room.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in `[0.0, 1.0]`; `0.0` when no lookups have occurred.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// O(1) LRU cache over pages, used by the pager to avoid re-reading hot
/// pages from disk. `IndexMap` preserves insertion order: front is least
/// recently used, back is most recently used.
pub struct BufferCache {
    capacity: usize,
    inner: RwLock<IndexMap<u32, Page>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BufferCache {
    /// Creates a cache holding at most `capacity` pages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(IndexMap::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Current number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the cache currently holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Inserts or replaces a page, evicting the least-recently-used entry
    /// if at capacity.
    pub fn insert(&self, page: Page) {
        let mut inner = self.inner.write();
        let id = page.id;
        if inner.shift_remove(&id).is_some() {
            inner.insert(id, page);
            return;
        }
        if inner.len() >= self.capacity {
            if inner.shift_remove_index(0).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        inner.insert(id, page);
    }

    /// Looks up a page by id, marking it most-recently-used on hit.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<Page> {
        let found = self.inner.read().get(&id).cloned();
        match found {
            Some(page) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let mut inner = self.inner.write();
                inner.shift_remove(&id);
                inner.insert(id, page.clone());
                Some(page)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Drops a page from the cache, e.g. after it's been freed.
    pub fn invalidate(&self, id: u32) {
        self.inner.write().swap_remove(&id);
    }

    /// Clears the cache entirely.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Returns a snapshot of hit/miss/eviction counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
