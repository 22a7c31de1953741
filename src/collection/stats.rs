//! Observability operations: `count`, `info`, `stats` (spec §4.11, §4.10).

use super::types::{Collection, CollectionInfo};
use crate::search::{SearchCacheStats, SearchStats};

/// Combined search/cache counters returned by [`Collection::stats`].
#[derive(Debug, Clone)]
pub struct CollectionStats {
    /// Search engine counters (hits, misses, latency).
    pub search: SearchStats,
    /// Result-cache counters (entries, evictions, cleanup runs).
    pub cache: SearchCacheStats,
}

impl Collection {
    /// Number of live (non-deleted) vectors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.vectors.read().len()
    }

    /// Structured snapshot of this collection's configuration and size.
    #[must_use]
    pub fn info(&self) -> CollectionInfo {
        let config = self.config.read();
        CollectionInfo {
            name: config.name.clone(),
            dimensions: config.dimensions,
            metric: config.metric,
            index_kind: config.index_kind,
            created: config.created,
            modified: config.modified,
            count: self.count(),
        }
    }

    /// Search and cache counters accumulated since this collection was opened.
    #[must_use]
    pub fn stats(&self) -> CollectionStats {
        let (search, cache) = self.search_engine.stats();
        CollectionStats { search, cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HnswConfig, SearchConfig};
    use crate::distance::DistanceMetric;
    use crate::index::IndexKind;
    use crate::vector::Vector;

    fn collection() -> Collection {
        let dir = tempfile::tempdir().unwrap();
        Collection::create(
            dir.path(),
            "docs",
            3,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            super::super::ContentPolicy::default(),
            false,
            &HnswConfig::default(),
            &SearchConfig::default(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn count_and_info_reflect_inserts() {
        let col = collection();
        col.insert(Vector::without_metadata("a", vec![1.0, 0.0, 0.0])).unwrap();
        col.insert(Vector::without_metadata("b", vec![0.0, 1.0, 0.0])).unwrap();
        assert_eq!(col.count(), 2);
        let info = col.info();
        assert_eq!(info.count, 2);
        assert_eq!(info.dimensions, 3);
    }

    #[test]
    fn stats_reflect_search_activity() {
        let col = collection();
        col.insert(Vector::without_metadata("a", vec![1.0, 0.0, 0.0])).unwrap();
        let request = crate::vector::SearchRequest {
            vector: vec![1.0, 0.0, 0.0],
            limit: 1,
            offset: 0,
            filter: None,
            include: crate::vector::IncludeFlags::default(),
        };
        col.search(&request).unwrap();
        let stats = col.stats();
        assert_eq!(stats.search.cache_misses, 1);
    }
}
