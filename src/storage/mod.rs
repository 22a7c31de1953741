//! Durable, page-oriented storage backing every collection.
//!
//! # Module Structure
//!
//! - [`page`]: fixed-size [`page::Page`] layout and checksums
//! - [`header`]: the file header persisted in page 0
//! - [`wal`]: write-ahead log, "log before write" durability
//! - [`buffer_cache`]: LRU cache of hot pages
//! - [`pager`]: [`pager::PagedStorage`], the core engine
//! - [`transaction`]: shadow-map transactions over a `PagedStorage`
//! - [`mmap_vectors`]: fixed-stride memory-mapped vector slab
//! - [`async_io`]: bounded-queue async front-end with write batching

pub mod async_io;
pub mod buffer_cache;
pub mod header;
pub mod mmap_vectors;
pub mod page;
pub mod pager;
pub mod transaction;
pub mod wal;

pub use async_io::{AsyncIoEngine, AsyncIoStats, Cancellation};
pub use buffer_cache::{BufferCache, CacheStats};
pub use header::FileHeader;
pub use mmap_vectors::MmapVectorStore;
pub use page::{Page, PageKind, PAGE_SIZE};
pub use pager::{PagedStorage, StorageStats};
pub use transaction::Transaction;
pub use wal::{Wal, WalOpKind, WalRecord};
