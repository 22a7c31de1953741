//! Error types for the VittoriaDB engine core.
//!
//! A single [`Error`] enum covers the taxonomy used across storage, indexing,
//! search and collection operations. Variant names follow the error kinds a
//! boundary adapter (REST, CLI) would need to map to status codes; the
//! mapping itself lives in that adapter, not here.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for VittoriaDB core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector dimension did not match the collection's configured dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimMismatch {
        /// Dimension configured for the collection.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// An id was empty where a non-empty id is required.
    #[error("vector id must not be empty")]
    EmptyId,

    /// A search request specified an invalid limit (must be > 0).
    #[error("invalid limit: {0}")]
    InvalidLimit(usize),

    /// A filter expression could not be evaluated against metadata.
    #[error("bad filter: {0}")]
    BadFilter(String),

    /// Text content exceeded the collection's content policy size limit.
    #[error("content too large: {size} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge {
        /// Size of the rejected content, in bytes.
        size: usize,
        /// Configured maximum, in bytes.
        limit: usize,
    },

    /// No collection exists with the given name.
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// No vector exists with the given id in the collection.
    #[error("vector '{0}' not found")]
    VectorNotFound(String),

    /// A collection with this name already exists.
    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    /// Insert attempted to reuse an id already present (and upsert is disabled).
    #[error("duplicate id: '{0}'")]
    DuplicateId(String),

    /// A write was attempted against a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// A transaction was used after a prior operation on it failed.
    #[error("transaction is no longer active")]
    TxInactive,

    /// The async I/O engine has been shut down and rejects new submissions.
    #[error("async I/O engine is shut down")]
    Shutdown,

    /// The async I/O engine's bounded queue is full.
    #[error("async I/O queue is full")]
    QueueFull,

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page, WAL, or file-header data failed validation (bad magic/version).
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// A page or WAL record checksum did not match its payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// An index or position fell outside the valid range for a store.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// `insert_text`/`search_text` called on a collection without a configured vectorizer.
    #[error("collection has no configured vectorizer")]
    NoVectorizer,

    /// The vectorizer failed to produce an embedding.
    #[error("embedding failed: {0}")]
    EmbedFailed(String),

    /// The operation was cancelled via its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration could not be parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for invariant violations that should never happen in practice.
    #[error("internal error: {0}")]
    Internal(String),
}
