//! Collection creation, loading, flushing, and closing (spec §4.11, §6.1).
//!
//! On-disk layout: `<data_dir>/<name>/metadata.json` (a [`CollectionConfig`])
//! plus `<data_dir>/<name>/vectors.json` (`id -> Vector`). A successful
//! [`Collection::flush`]/[`Collection::close`] followed by [`Collection::open`]
//! reproduces an equivalent in-memory index and vector set.

use super::types::{now_epoch_secs, Collection, CollectionConfig};
use super::ContentPolicy;
use crate::config::{HnswConfig, SearchConfig};
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::{FlatIndex, HnswIndex, IndexKind, VectorIndex};
use crate::search::ParallelSearchEngine;
use crate::vector::Vector;
use crate::vectorizer::Vectorizer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const METADATA_FILE: &str = "metadata.json";
const VECTORS_FILE: &str = "vectors.json";

fn build_index(
    dimensions: usize,
    metric: DistanceMetric,
    kind: IndexKind,
    hnsw_config: &HnswConfig,
    upsert: bool,
) -> Result<Box<dyn VectorIndex>> {
    match kind {
        IndexKind::Flat => Ok(Box::new(FlatIndex::new(dimensions, metric))),
        IndexKind::Hnsw => Ok(Box::new(HnswIndex::new(dimensions, metric, hnsw_config, upsert))),
        IndexKind::Ivf => Err(Error::Config(
            "ivf index is reserved for a future release".to_string(),
        )),
    }
}

impl Collection {
    /// Creates a brand-new collection directory under `data_dir` and
    /// returns the empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if the directory already holds
    /// a `metadata.json`, or propagates I/O/config errors.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        data_dir: &Path,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        index_kind: IndexKind,
        content_policy: ContentPolicy,
        upsert: bool,
        hnsw_config: &HnswConfig,
        search_config: &SearchConfig,
        vectorizer: Option<Arc<dyn Vectorizer>>,
    ) -> Result<Self> {
        let dir = data_dir.join(name);
        if dir.join(METADATA_FILE).exists() {
            return Err(Error::CollectionExists(name.to_string()));
        }
        fs::create_dir_all(&dir)?;

        let now = now_epoch_secs();
        let config = CollectionConfig {
            name: name.to_string(),
            dimensions,
            metric,
            index_kind,
            created: now,
            modified: now,
            content_policy,
            upsert,
        };
        let index = build_index(dimensions, metric, index_kind, hnsw_config, upsert)?;
        let search_engine = ParallelSearchEngine::new(search_config.clone())?;

        let collection = Self {
            config: RwLock::new(config),
            index,
            vectors: RwLock::new(HashMap::new()),
            search_engine,
            vectorizer,
            data_dir: dir,
        };
        collection.flush()?;
        Ok(collection)
    }

    /// Loads an existing collection directory, reinserting every persisted
    /// vector into a freshly built index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if `metadata.json` is absent,
    /// or propagates I/O/deserialization/index errors.
    pub fn open(
        data_dir: &Path,
        name: &str,
        hnsw_config: &HnswConfig,
        search_config: &SearchConfig,
        vectorizer: Option<Arc<dyn Vectorizer>>,
    ) -> Result<Self> {
        let dir = data_dir.join(name);
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        let config: CollectionConfig =
            serde_json::from_slice(&fs::read(&metadata_path)?).map_err(|e| Error::Corrupt(e.to_string()))?;
        let vectors_path = dir.join(VECTORS_FILE);
        let vectors: HashMap<String, Vector> = if vectors_path.exists() {
            serde_json::from_slice(&fs::read(&vectors_path)?).map_err(|e| Error::Corrupt(e.to_string()))?
        } else {
            HashMap::new()
        };

        let index = build_index(
            config.dimensions,
            config.metric,
            config.index_kind,
            hnsw_config,
            config.upsert,
        )?;
        for vector in vectors.values() {
            index.insert(&vector.id, &vector.values)?;
        }

        let search_engine = ParallelSearchEngine::new(search_config.clone())?;
        Ok(Self {
            config: RwLock::new(config),
            index,
            vectors: RwLock::new(vectors),
            search_engine,
            vectorizer,
            data_dir: dir,
        })
    }

    /// Atomically persists the current config and vector set.
    ///
    /// # Errors
    ///
    /// Propagates I/O or serialization errors.
    pub fn flush(&self) -> Result<()> {
        let config = self.config.read().clone();
        let vectors = self.vectors.read();
        write_atomic(
            &self.data_dir.join(METADATA_FILE),
            &serde_json::to_vec_pretty(&config).map_err(|e| Error::Internal(e.to_string()))?,
        )?;
        write_atomic(
            &self.data_dir.join(VECTORS_FILE),
            &serde_json::to_vec(&*vectors).map_err(|e| Error::Internal(e.to_string()))?,
        )?;
        Ok(())
    }

    /// Flushes then releases. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Propagates [`Collection::flush`]'s errors.
    pub fn close(&self) -> Result<()> {
        self.flush()
    }

    /// Whether this collection has a configured vectorizer.
    #[must_use]
    pub fn has_vectorizer(&self) -> bool {
        self.vectorizer.is_some()
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Directory a [`Collection`] with `name` lives in under `data_dir`.
#[must_use]
pub fn collection_dir(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKind;

    fn configs() -> (HnswConfig, SearchConfig) {
        (HnswConfig::default(), SearchConfig::default())
    }

    #[test]
    fn create_then_open_preserves_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let (hnsw, search) = configs();
        Collection::create(
            dir.path(),
            "docs",
            4,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            ContentPolicy::default(),
            false,
            &hnsw,
            &search,
            None,
        )
        .unwrap();

        let reopened = Collection::open(dir.path(), "docs", &hnsw, &search, None).unwrap();
        assert_eq!(reopened.index.len(), 0);
    }

    #[test]
    fn create_twice_errors_collection_exists() {
        let dir = tempfile::tempdir().unwrap();
        let (hnsw, search) = configs();
        Collection::create(
            dir.path(),
            "docs",
            4,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            ContentPolicy::default(),
            false,
            &hnsw,
            &search,
            None,
        )
        .unwrap();

        let result = Collection::create(
            dir.path(),
            "docs",
            4,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            ContentPolicy::default(),
            false,
            &hnsw,
            &search,
            None,
        );
        assert!(matches!(result, Err(Error::CollectionExists(_))));
    }

    #[test]
    fn requesting_ivf_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (hnsw, search) = configs();
        let result = Collection::create(
            dir.path(),
            "docs",
            4,
            DistanceMetric::Cosine,
            IndexKind::Ivf,
            ContentPolicy::default(),
            false,
            &hnsw,
            &search,
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn open_missing_collection_errors_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (hnsw, search) = configs();
        let result = Collection::open(dir.path(), "ghost", &hnsw, &search, None);
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }
}
