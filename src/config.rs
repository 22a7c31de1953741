//! Engine configuration.
//!
//! Configuration layers from lowest to highest priority: built-in defaults,
//! a `vittoria.toml` file, `VITTORIA_*` environment variables, and finally
//! runtime overrides applied by the caller after [`EngineConfig::load`].

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Buffer cache and WAL configuration for the paged storage engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of pages the buffer cache holds before evicting.
    pub cache_capacity_pages: usize,
    /// fsync the WAL after every append (durable but slower).
    pub wal_sync_on_append: bool,
    /// Default data directory for `Database::open`.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_capacity_pages: 4096,
            wal_sync_on_append: true,
            data_dir: "./vittoriadb_data".to_string(),
        }
    }
}

/// HNSW index construction/search defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Neighbors per node above layer 0 (M).
    pub m: usize,
    /// Neighbors per node above layer 0 after pruning (`Mmax`).
    pub m_max: usize,
    /// Neighbors per node at layer 0 (`Mmax0`, default 2*M).
    pub m_max_0: usize,
    /// Level-generation multiplier (`ml`), applied to an exponential draw.
    pub ml: f64,
    /// Candidate pool size during construction.
    pub ef_construction: usize,
    /// Candidate pool size during search.
    pub ef_search: usize,
    /// PRNG seed for layer assignment (deterministic by default).
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m_max: 32,
            m_max_0: 64,
            ml: 1.442_695_040_888_963_4,
            ef_construction: 100,
            ef_search: 100,
            seed: 42,
        }
    }
}

/// Execution mode for the math kernels and the parallel search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Plain scalar loops.
    Scalar,
    /// 8-wide unrolled loops via the `wide` crate.
    #[default]
    Vectorized,
    /// `Vectorized` fanned out across a worker pool, bounded by a semaphore.
    Parallel,
}

/// Parallel search engine and result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Math kernel execution mode.
    pub execution_mode: ExecutionMode,
    /// Whether to fan batches out to the worker pool at all (see §4.10 strategy).
    pub parallel_enabled: bool,
    /// Number of worker threads in the search/math worker pool.
    pub workers: usize,
    /// Candidates per batch dispatched to a worker.
    pub batch_size: usize,
    /// Maximum live entries in the result cache.
    pub cache_max_entries: usize,
    /// Cache entry time-to-live, in milliseconds.
    pub cache_ttl_ms: u64,
    /// Interval between cache TTL sweeps, in milliseconds.
    pub cache_cleanup_interval_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Vectorized,
            parallel_enabled: true,
            workers: 4,
            batch_size: 1024,
            cache_max_entries: 1000,
            cache_ttl_ms: 60_000,
            cache_cleanup_interval_ms: 30_000,
        }
    }
}

/// Async I/O engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncIoConfig {
    /// Whether submissions go through the worker pool at all.
    pub enabled: bool,
    /// Number of worker threads.
    pub workers: usize,
    /// Bounded submission queue depth.
    pub queue_depth: usize,
    /// Queued-write count that triggers an immediate batch flush.
    pub batch_size: usize,
    /// Maximum delay before a partial batch is flushed anyway, in milliseconds.
    pub flush_interval_ms: u64,
}

impl Default for AsyncIoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 2,
            queue_depth: 1024,
            batch_size: 64,
            flush_interval_ms: 50,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Paged storage / WAL / buffer cache settings.
    pub storage: StorageConfig,
    /// HNSW defaults.
    pub hnsw: HnswConfig,
    /// Search engine and cache settings.
    pub search: SearchConfig,
    /// Async I/O engine settings.
    pub async_io: AsyncIoConfig,
}

impl EngineConfig {
    /// Loads configuration layering defaults, an optional `vittoria.toml`, and
    /// `VITTORIA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file or environment values fail to
    /// parse into the expected shape.
    pub fn load() -> Result<Self> {
        Self::load_from_path("vittoria.toml")
    }

    /// Loads configuration from a specific TOML file path (which need not exist).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if present values fail to parse or fail
    /// [`EngineConfig::validate`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("VITTORIA_").split("_").lowercase(false));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges that serde's defaulting cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if self.hnsw.m == 0 {
            return Err(Error::Config("hnsw.m must be >= 1".into()));
        }
        if self.hnsw.ef_construction == 0 {
            return Err(Error::Config("hnsw.ef_construction must be >= 1".into()));
        }
        if self.search.workers == 0 {
            return Err(Error::Config("search.workers must be >= 1".into()));
        }
        if self.search.batch_size == 0 {
            return Err(Error::Config("search.batch_size must be >= 1".into()));
        }
        if self.storage.cache_capacity_pages == 0 {
            return Err(Error::Config(
                "storage.cache_capacity_pages must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
