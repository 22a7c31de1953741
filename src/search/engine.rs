//! Parallel search engine (spec §4.10): cache lookup, strategy selection,
//! batched metadata filtering, bounded-heap-free ordered merge, stats.

use super::cache::SearchCache;
use super::pool::SearchPool;
use super::stats::{AtomicSearchStats, SearchCacheStats, SearchStats};
use crate::config::SearchConfig;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::filter::Filter;
use crate::index::VectorIndex;
use crate::vector::{IncludeFlags, SearchRequest, SearchResponse, SearchResult};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Everything the engine needs from the owning collection to turn index
/// hits into full [`SearchResult`]s, without the engine knowing how
/// vectors/metadata/content are actually stored.
pub trait CandidateSource: Send + Sync {
    /// The index to query for nearest neighbors.
    fn index(&self) -> &dyn VectorIndex;
    /// Metadata for `id`, if it still exists.
    fn metadata(&self, id: &str) -> Option<Map<String, Value>>;
    /// Raw vector values for `id`, if still present.
    fn vector(&self, id: &str) -> Option<Vec<f32>>;
    /// Content text for `id`, honoring the collection's content policy.
    fn content(&self, id: &str) -> Option<String>;
}

/// Computes the deterministic cache key for a search request (spec §4.10
/// step 1): collection name, query bytes, limit, offset, include flags,
/// serialized filter, metric.
fn fingerprint(collection: &str, request: &SearchRequest, metric: DistanceMetric) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    collection.hash(&mut hasher);
    for v in &request.vector {
        v.to_bits().hash(&mut hasher);
    }
    request.limit.hash(&mut hasher);
    request.offset.hash(&mut hasher);
    request.include.vector.hash(&mut hasher);
    request.include.metadata.hash(&mut hasher);
    request.include.content.hash(&mut hasher);
    serde_json::to_vec(&request.filter)
        .unwrap_or_default()
        .hash(&mut hasher);
    metric.wire_value().hash(&mut hasher);
    hasher.finish()
}

/// Owns the worker pool, result cache, and stats for one collection's
/// searches.
pub struct ParallelSearchEngine {
    config: SearchConfig,
    pool: SearchPool,
    cache: SearchCache,
    stats: AtomicSearchStats,
}

impl ParallelSearchEngine {
    /// Builds an engine from `config`.
    ///
    /// # Errors
    ///
    /// Propagates [`SearchPool::new`]'s error if the worker pool fails to start.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let pool = SearchPool::new(config.workers)?;
        let cache = SearchCache::new(
            config.cache_max_entries,
            Duration::from_millis(config.cache_ttl_ms),
        );
        Ok(Self {
            config,
            pool,
            cache,
            stats: AtomicSearchStats::default(),
        })
    }

    /// Invalidates every cached response. Call after any insert/delete so
    /// future hits always reflect current state (spec §8 cache consistency).
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Serves `request` against `source` under `collection`/`metric`,
    /// going through the result cache first.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::index::VectorIndex::search`]'s errors (e.g.
    /// `DimMismatch`).
    pub fn search(
        &self,
        collection: &str,
        source: &dyn CandidateSource,
        metric: DistanceMetric,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let key = fingerprint(collection, request, metric);
        if let Some(cached) = self.cache.get(key) {
            self.stats.record_hit();
            return Ok(cached);
        }

        let started = Instant::now();
        let index = source.index();
        let use_parallel =
            self.config.parallel_enabled && index.len() >= self.config.workers * self.config.batch_size;

        let candidates_k = if request.filter.is_some() {
            (request.limit + request.offset)
                .saturating_mul(4)
                .max(request.limit + request.offset + 10)
        } else {
            request.limit + request.offset
        };

        let hits = index.search(&request.vector, candidates_k.max(1))?;

        let filtered = Self::apply_filter(
            source,
            hits,
            request.filter.as_ref(),
            use_parallel,
            &self.pool,
            self.config.batch_size,
        );

        let total_candidates_after_filter = filtered.len();
        let page: Vec<(String, f32, Option<Map<String, Value>>)> = filtered
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        let results = page
            .into_iter()
            .map(|(id, score, metadata)| Self::build_result(source, id, score, metadata, &request.include))
            .collect();

        let response = SearchResponse {
            results,
            total_candidates_after_filter,
            took_ms: started.elapsed().as_secs_f64() * 1000.0,
            request_id: new_request_id(),
        };

        self.cache.insert(key, response.clone());
        self.stats
            .record_miss(use_parallel, started.elapsed().as_micros() as u64);
        Ok(response)
    }

    fn apply_filter(
        source: &dyn CandidateSource,
        hits: Vec<(String, f32)>,
        filter: Option<&Filter>,
        parallel: bool,
        pool: &SearchPool,
        batch_size: usize,
    ) -> Vec<(String, f32, Option<Map<String, Value>>)> {
        let Some(filter) = filter else {
            return hits.into_iter().map(|(id, score)| (id, score, None)).collect();
        };

        let keep = |id: &str, score: f32| -> Option<(String, f32, Option<Map<String, Value>>)> {
            let metadata = source.metadata(id).unwrap_or_default();
            let value = Value::Object(metadata.clone());
            if filter.matches(&value) {
                Some((id.to_string(), score, Some(metadata)))
            } else {
                None
            }
        };

        if parallel && hits.len() > batch_size {
            pool.install(|| {
                hits.par_chunks(batch_size)
                    .flat_map_iter(|chunk| {
                        chunk
                            .iter()
                            .filter_map(|(id, score)| keep(id, *score))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            })
        } else {
            hits.iter()
                .filter_map(|(id, score)| keep(id, *score))
                .collect()
        }
    }

    fn build_result(
        source: &dyn CandidateSource,
        id: String,
        score: f32,
        metadata: Option<Map<String, Value>>,
        include: &IncludeFlags,
    ) -> SearchResult {
        let vector = include.vector.then(|| source.vector(&id)).flatten();
        let content = include.content.then(|| source.content(&id)).flatten();
        let metadata = if include.metadata {
            metadata.or_else(|| source.metadata(&id))
        } else {
            None
        };
        SearchResult {
            id,
            score,
            vector,
            metadata,
            content,
        }
    }

    /// Snapshot of search and cache counters for [`crate::collection`]'s
    /// `stats()` observer.
    #[must_use]
    pub fn stats(&self) -> (SearchStats, SearchCacheStats) {
        (self.stats.snapshot(self.pool.workers()), self.cache.stats())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(target_arch = "wasm32")]
fn new_request_id() -> String {
    // uuid's v4 generator needs an RNG source unavailable on wasm32 here.
    format!("req-{}", rustc_hash::FxHasher::default().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMetric;
    use crate::index::flat::FlatIndex;
    use std::collections::HashMap;

    struct FakeSource {
        index: FlatIndex,
        metadata: HashMap<String, Map<String, Value>>,
    }

    impl CandidateSource for FakeSource {
        fn index(&self) -> &dyn VectorIndex {
            &self.index
        }
        fn metadata(&self, id: &str) -> Option<Map<String, Value>> {
            self.metadata.get(id).cloned()
        }
        fn vector(&self, _id: &str) -> Option<Vec<f32>> {
            None
        }
        fn content(&self, _id: &str) -> Option<String> {
            None
        }
    }

    fn request(vector: Vec<f32>, limit: usize) -> SearchRequest {
        SearchRequest {
            vector,
            limit,
            offset: 0,
            filter: None,
            include: IncludeFlags::default(),
        }
    }

    #[test]
    fn cache_hit_returns_identical_response() {
        let index = FlatIndex::new(2, DistanceMetric::Cosine);
        index.insert("a", &[1.0, 0.0]).unwrap();
        let source = FakeSource {
            index,
            metadata: HashMap::new(),
        };
        let engine = ParallelSearchEngine::new(SearchConfig::default()).unwrap();

        let req = request(vec![1.0, 0.0], 1);
        let first = engine
            .search("c", &source, DistanceMetric::Cosine, &req)
            .unwrap();
        let second = engine
            .search("c", &source, DistanceMetric::Cosine, &req)
            .unwrap();
        assert_eq!(first.results[0].id, second.results[0].id);
        assert_eq!(engine.stats().0.cache_hits, 1);
    }

    #[test]
    fn sequential_and_parallel_paths_agree_on_ordering() {
        let index = FlatIndex::new(2, DistanceMetric::Euclidean);
        for i in 0..50 {
            index.insert(&format!("v{i}"), &[i as f32, 0.0]).unwrap();
        }
        let source = FakeSource {
            index,
            metadata: HashMap::new(),
        };

        let mut sequential_config = SearchConfig::default();
        sequential_config.parallel_enabled = false;
        let sequential = ParallelSearchEngine::new(sequential_config).unwrap();

        let mut parallel_config = SearchConfig::default();
        parallel_config.workers = 2;
        parallel_config.batch_size = 1;
        let parallel = ParallelSearchEngine::new(parallel_config).unwrap();

        let req = request(vec![0.0, 0.0], 10);
        let seq_resp = sequential
            .search("c", &source, DistanceMetric::Euclidean, &req)
            .unwrap();
        let par_resp = parallel
            .search("c", &source, DistanceMetric::Euclidean, &req)
            .unwrap();

        let seq_ids: Vec<&str> = seq_resp.results.iter().map(|r| r.id.as_str()).collect();
        let par_ids: Vec<&str> = par_resp.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(seq_ids, par_ids);
    }

    #[test]
    fn filter_excludes_non_matching_metadata() {
        let index = FlatIndex::new(2, DistanceMetric::Cosine);
        index.insert("a", &[1.0, 0.0]).unwrap();
        index.insert("b", &[1.0, 0.0]).unwrap();
        let mut metadata = HashMap::new();
        let mut tags = Map::new();
        tags.insert("kind".to_string(), Value::String("keep".to_string()));
        metadata.insert("a".to_string(), tags);
        let source = FakeSource { index, metadata };

        let engine = ParallelSearchEngine::new(SearchConfig::default()).unwrap();
        let mut req = request(vec![1.0, 0.0], 10);
        req.filter = Some(Filter::new(crate::filter::Condition::Eq {
            field: "kind".to_string(),
            value: Value::String("keep".to_string()),
        }));

        let resp = engine
            .search("c", &source, DistanceMetric::Cosine, &req)
            .unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].id, "a");
    }

    #[test]
    fn invalidate_cache_forces_recompute() {
        let index = FlatIndex::new(2, DistanceMetric::Cosine);
        index.insert("a", &[1.0, 0.0]).unwrap();
        let source = FakeSource {
            index,
            metadata: HashMap::new(),
        };
        let engine = ParallelSearchEngine::new(SearchConfig::default()).unwrap();
        let req = request(vec![1.0, 0.0], 1);
        engine.search("c", &source, DistanceMetric::Cosine, &req).unwrap();
        engine.invalidate_cache();
        engine.search("c", &source, DistanceMetric::Cosine, &req).unwrap();
        assert_eq!(engine.stats().0.cache_hits, 0);
        assert_eq!(engine.stats().0.cache_misses, 2);
    }
}
