//! Vector index implementations (spec §4.9).
//!
//! # Module Structure
//!
//! - [`flat`]: brute-force exact search, used for small collections or when
//!   perfect recall is required
//! - [`hnsw`]: approximate nearest-neighbor search via a hierarchical
//!   navigable small-world graph

pub mod flat;
pub mod hnsw;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;

use crate::error::Result;

/// Which concrete index backs a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Linear scan; exact, O(n) per query.
    Flat,
    /// Hierarchical navigable small-world graph; approximate, sub-linear.
    Hnsw,
    /// Inverted file index — reserved for a future release (spec Open
    /// Question: requesting it returns [`crate::error::Error::Config`]).
    Ivf,
}

/// Common surface every vector index implements, so the collection and
/// search layers don't need to know which concrete index they're driving.
pub trait VectorIndex: Send + Sync {
    /// Inserts a vector under `id`. Behavior on a duplicate id is
    /// implementation-defined by the collection's upsert policy, applied
    /// by the caller before invoking this trait (see
    /// [`crate::collection`]).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DimMismatch`] if `values.len()` does
    /// not match this index's configured dimension.
    fn insert(&self, id: &str, values: &[f32]) -> Result<()>;

    /// Removes `id` from the index. A no-op (returns `Ok`) if the id is
    /// not present, matching the collection layer's idempotent delete.
    ///
    /// # Errors
    ///
    /// Propagates any internal index error.
    fn delete(&self, id: &str) -> Result<()>;

    /// Finds up to `k` nearest neighbors of `query`, sorted by descending
    /// score (higher is always more similar).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::DimMismatch`] if `query.len()` does
    /// not match this index's configured dimension.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>>;

    /// Number of live (non-deleted) vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no live vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension every stored vector must match.
    fn dimension(&self) -> usize;
}
