//! Brute-force exact vector index.
//!
//! Scores every stored vector against the query and takes the top `k`.
//! Used for small collections (or an `Ivf` stand-in, per spec §9) where
//! exactness beats HNSW's approximate recall.

use super::VectorIndex;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

struct Entry {
    values: Vec<f32>,
}

/// Linear-scan index: O(n) per query, O(1) insert/delete, zero
/// approximation error.
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    entries: RwLock<FxHashMap<String, Entry>>,
}

impl FlatIndex {
    /// Creates an empty flat index for `dimension`-length vectors scored
    /// with `metric`.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            entries: RwLock::new(FxHashMap::default()),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&self, id: &str, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        self.entries.write().insert(
            id.to_string(),
            Entry {
                values: values.to_vec(),
            },
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().remove(id);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let entries = self.entries.read();
        let mut scored: Vec<(String, f32)> = entries
            .iter()
            .map(|(id, entry)| {
                let raw = self.metric.calculate(query, &entry.values);
                (id.clone(), self.metric.to_score(raw))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
