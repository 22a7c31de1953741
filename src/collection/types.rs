//! The `Collection` type and its on-disk-serializable configuration.

use super::content_policy::ContentPolicy;
use crate::distance::DistanceMetric;
use crate::index::IndexKind;
use crate::search::ParallelSearchEngine;
use crate::vector::Vector;
use crate::vectorizer::Vectorizer;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Persisted collection configuration — the contents of `metadata.json`
/// (spec §6.1), minus the vector set itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Unique name within the owning database.
    pub name: String,
    /// Dimension every vector in this collection must have.
    pub dimensions: usize,
    /// Distance metric used for scoring and ranking.
    pub metric: DistanceMetric,
    /// Which index backs this collection.
    pub index_kind: IndexKind,
    /// Unix epoch seconds at creation.
    pub created: i64,
    /// Unix epoch seconds at last mutation.
    pub modified: i64,
    /// Original-content retention policy.
    #[serde(default, rename = "content_storage")]
    pub content_policy: ContentPolicy,
    /// Whether re-inserting an existing id overwrites it (`true`) or is
    /// rejected with `DuplicateId` (`false`). Open Question 1.
    #[serde(default)]
    pub upsert: bool,
}

/// Structured snapshot returned by [`Collection::info`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// See [`CollectionConfig::name`].
    pub name: String,
    /// See [`CollectionConfig::dimensions`].
    pub dimensions: usize,
    /// See [`CollectionConfig::metric`].
    pub metric: DistanceMetric,
    /// See [`CollectionConfig::index_kind`].
    pub index_kind: IndexKind,
    /// See [`CollectionConfig::created`].
    pub created: i64,
    /// See [`CollectionConfig::modified`].
    pub modified: i64,
    /// Live vector count.
    pub count: usize,
}

/// Binds an index, its vector/metadata set, a search engine, and a
/// content policy behind the public operations named in spec §4.11.
///
/// A vector's values and metadata live in `vectors`; the index only ever
/// sees `(id, values)`. This keeps `VectorIndex` implementations ignorant
/// of metadata, filtering, and content, which are search-engine and
/// collection concerns.
pub struct Collection {
    pub(super) config: RwLock<CollectionConfig>,
    pub(super) index: Box<dyn crate::index::VectorIndex>,
    pub(super) vectors: RwLock<HashMap<String, Vector>>,
    pub(super) search_engine: ParallelSearchEngine,
    pub(super) vectorizer: Option<Arc<dyn Vectorizer>>,
    pub(super) data_dir: PathBuf,
}

impl Collection {
    pub(super) fn touch_modified(&self) {
        self.config.write().modified = now_epoch_secs();
    }
}

pub(super) fn now_epoch_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
