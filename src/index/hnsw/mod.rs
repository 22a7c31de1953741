//! Hierarchical navigable small-world approximate nearest-neighbor index.

mod graph;
mod layer;
mod mappings;

use super::VectorIndex;
use crate::config::HnswConfig;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use graph::{Graph, GraphParams};
use mappings::HnswMappings;
use parking_lot::RwLock;

/// HNSW-backed index over string-keyed vectors.
///
/// Whether inserting a duplicate id overwrites the existing vector or
/// returns [`Error::DuplicateId`] is controlled by `upsert`, set at
/// construction from the owning collection's configuration.
pub struct HnswIndex {
    dimension: usize,
    ef_search: usize,
    upsert: bool,
    graph: Graph,
    mappings: RwLock<HnswMappings>,
}

impl HnswIndex {
    /// Builds an empty index for `dimension`-length vectors scored with
    /// `metric`, tuned by `config`.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric, config: &HnswConfig, upsert: bool) -> Self {
        let params = GraphParams {
            m: config.m,
            m_max: config.m_max,
            m_max_0: config.m_max_0,
            ef_construction: config.ef_construction,
            ml: config.ml,
            seed: config.seed,
        };
        Self {
            dimension,
            ef_search: config.ef_search,
            upsert,
            graph: Graph::new(metric, params),
            mappings: RwLock::new(HnswMappings::new()),
        }
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&self, id: &str, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        if id.is_empty() {
            return Err(Error::EmptyId);
        }

        let mut mappings = self.mappings.write();
        if mappings.get_idx(id).is_some() {
            if !self.upsert {
                return Err(Error::DuplicateId(id.to_string()));
            }
            let old_idx = mappings.remove(id).expect("presence just checked");
            self.graph.delete(old_idx);
        }

        let new_idx = self.graph.insert(values.to_vec());
        let registered = mappings.register(id);
        debug_assert_eq!(registered, Some(new_idx));
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut mappings = self.mappings.write();
        if let Some(idx) = mappings.remove(id) {
            self.graph.delete(idx);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mappings = self.mappings.read();
        let hits = self.graph.search(query, k, self.ef_search);
        let mut scored: Vec<(String, f32)> = hits
            .into_iter()
            .filter_map(|(node_id, internal_dist)| {
                mappings
                    .get_id(node_id)
                    .map(|id| (id, self.graph.internal_to_score(internal_dist)))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.graph.live_count()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(upsert: bool) -> HnswIndex {
        HnswIndex::new(3, DistanceMetric::Cosine, &HnswConfig::default(), upsert)
    }

    #[test]
    fn insert_and_search_round_trips() {
        let index = index(false);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();
        index.insert("b", &[0.0, 1.0, 0.0]).unwrap();
        let results = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn duplicate_insert_without_upsert_errors() {
        let index = index(false);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            index.insert("a", &[0.0, 1.0, 0.0]),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn duplicate_insert_with_upsert_replaces_vector() {
        let index = index(true);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();
        index.insert("a", &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 1);
        let results = index.search(&[0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn delete_then_search_excludes_id() {
        let index = index(false);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();
        index.insert("b", &[0.9, 0.1, 0.0]).unwrap();
        index.delete("a").unwrap();
        assert_eq!(index.len(), 1);
        let results = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert!(results.iter().all(|(id, _)| id != "a"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let index = index(false);
        assert!(matches!(
            index.insert("", &[1.0, 0.0, 0.0]),
            Err(Error::EmptyId)
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = index(false);
        assert!(matches!(
            index.insert("a", &[1.0, 0.0]),
            Err(Error::DimMismatch { .. })
        ));
    }
}
