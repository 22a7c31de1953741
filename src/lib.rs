//! # VittoriaDB core
//!
//! Embedded vector database engine: paged storage with write-ahead logging,
//! an HNSW and flat-scan index, a metadata filter language, and a parallel
//! search engine with result caching, bound together by a [`Database`] of
//! named [`Collection`]s.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use vittoriadb_core::{Database, DistanceMetric};
//! use vittoriadb_core::index::IndexKind;
//! use vittoriadb_core::collection::ContentPolicy;
//! use vittoriadb_core::vector::Vector;
//!
//! let db = Database::open("./data")?;
//! db.create_collection("documents", 768, DistanceMetric::Cosine, IndexKind::Hnsw)?;
//! let collection = db.get_collection("documents").unwrap();
//! collection.insert(Vector::without_metadata("doc-1", vec![0.1; 768]))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod filter;
pub mod index;
pub mod search;
pub mod simd;
pub mod storage;
pub mod vector;
pub mod vectorizer;

pub use collection::{Collection, CollectionConfig, CollectionInfo};
pub use config::EngineConfig;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::{IndexKind, VectorIndex};

use collection::ContentPolicy;
use config::{HnswConfig, SearchConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vectorizer::Vectorizer;

/// A cheap-to-clone handle to an open [`Collection`], held by [`Database`]
/// and returned from [`Database::get_collection`].
pub type CollectionHandle = Arc<Collection>;

/// An embedded database: a directory on disk holding zero or more named
/// [`Collection`]s, each with its own index and search engine.
pub struct Database {
    data_dir: PathBuf,
    hnsw_config: HnswConfig,
    search_config: SearchConfig,
    collections: RwLock<HashMap<String, CollectionHandle>>,
}

impl Database {
    /// Opens a database rooted at `path`, creating the directory if absent,
    /// and loads every collection found there.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors creating the directory, or any error from
    /// [`Collection::open`] while loading an existing collection.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, EngineConfig::default())
    }

    /// Like [`Database::open`], but with explicit engine configuration
    /// instead of [`EngineConfig::default`].
    ///
    /// # Errors
    ///
    /// See [`Database::open`].
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let mut collections = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().join("metadata.json").exists() {
                continue;
            }
            let collection = Collection::open(&data_dir, &name, &config.hnsw, &config.search, None)?;
            collections.insert(name, Arc::new(collection));
        }

        Ok(Self {
            data_dir,
            hnsw_config: config.hnsw,
            search_config: config.search,
            collections: RwLock::new(collections),
        })
    }

    /// Creates a new, empty collection with default content policy and
    /// upsert-disabled semantics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if a collection with this name
    /// is already open, or propagates [`Collection::create`]'s errors.
    pub fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        index_kind: IndexKind,
    ) -> Result<()> {
        self.create_collection_with(name, dimensions, metric, index_kind, ContentPolicy::default(), false, None)
    }

    /// Creates a new collection with full control over content policy,
    /// upsert semantics, and vectorizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionExists`] if a collection with this name
    /// is already open, or propagates [`Collection::create`]'s errors.
    #[allow(clippy::too_many_arguments)]
    pub fn create_collection_with(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
        index_kind: IndexKind,
        content_policy: ContentPolicy,
        upsert: bool,
        vectorizer: Option<Arc<dyn Vectorizer>>,
    ) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }

        let collection = Collection::create(
            &self.data_dir,
            name,
            dimensions,
            metric,
            index_kind,
            content_policy,
            upsert,
            &self.hnsw_config,
            &self.search_config,
            vectorizer,
        )?;
        collections.insert(name.to_string(), Arc::new(collection));
        Ok(())
    }

    /// Returns a handle to a collection by name, if it is open.
    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<CollectionHandle> {
        self.collections.read().get(name).cloned()
    }

    /// Names of every currently open collection.
    #[must_use]
    pub fn list_collections(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Flushes and removes a collection, deleting its on-disk directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if no such collection is open.
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        let Some(collection) = collections.remove(name) else {
            return Err(Error::CollectionNotFound(name.to_string()));
        };
        drop(collection);

        let path = collection::collection_dir(&self.data_dir, name);
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}
