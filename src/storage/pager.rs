//! Paged storage engine: the durable backbone every collection sits on.
//!
//! Page 0 holds the [`FileHeader`]; every write goes through the WAL before
//! it lands in the data file ("log before write", spec §4.4). A
//! [`BufferCache`] sits in front of the data file to absorb repeat reads.

use super::buffer_cache::{BufferCache, CacheStats};
use super::header::FileHeader;
use super::page::{Page, PageKind, PAGE_SIZE};
use super::wal::{Wal, WalOpKind};
use crate::error::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Point-in-time counters describing a paged store's activity.
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Total pages in the file, including the header page.
    pub page_count: u32,
    /// Pages currently on the free list.
    pub free_pages: u32,
    /// Buffer cache hit/miss/eviction counters.
    pub cache: CacheStats,
    /// Next WAL sequence number that will be assigned.
    pub wal_next_seq: u64,
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A durable, page-oriented key-value-ish store: the unit other modules
/// (HNSW graphs, mmap vector slabs, collection metadata) persist pages
/// into.
///
/// `open` replays any WAL records left over from an unclean shutdown before
/// the store becomes usable, so callers never observe a torn write.
pub struct PagedStorage {
    path: PathBuf,
    data_file: Mutex<File>,
    wal: Mutex<Wal>,
    cache: BufferCache,
    header: RwLock<FileHeader>,
    next_page_id: AtomicU32,
}

impl PagedStorage {
    /// Opens (creating if absent) a paged store rooted at `path`, a
    /// directory holding `data.vdb` and `wal.log`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure or [`Error::Corrupt`]
    /// if an existing header fails to parse.
    pub fn open(path: impl AsRef<Path>, cache_capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(Error::Io)?;

        let data_path = path.join("data.vdb");
        let is_new = !data_path.exists();
        let mut data_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&data_path)
            .map_err(Error::Io)?;

        if is_new {
            let header = FileHeader::new(PAGE_SIZE as u32, now_epoch_secs());
            let mut page = Page::empty(0, PageKind::Header);
            page.set_payload(&header.to_payload())?;
            page.seal();
            data_file
                .write_all(&page.to_bytes())
                .map_err(Error::Io)?;
            data_file.sync_all().map_err(Error::Io)?;
        }

        let wal_path = path.join("wal.log");
        let mut wal = Wal::open(&wal_path)?;
        Self::recover(&mut data_file, &mut wal)?;

        let header = Self::read_header_from(&mut data_file)?;
        let cache = BufferCache::new(cache_capacity);
        let next_page_id = AtomicU32::new(header.page_count);

        Ok(Self {
            path,
            data_file: Mutex::new(data_file),
            wal: Mutex::new(wal),
            cache,
            header: RwLock::new(header),
            next_page_id,
        })
    }

    fn read_header_from(data_file: &mut File) -> Result<FileHeader> {
        data_file.seek(SeekFrom::Start(0)).map_err(Error::Io)?;
        let mut buf = [0u8; PAGE_SIZE];
        data_file.read_exact(&mut buf).map_err(Error::Io)?;
        let page = Page::from_bytes(&buf)?;
        page.verify_checksum()?;
        FileHeader::from_payload(page.data())
    }

    /// Replays any WAL records against the data file, then truncates the
    /// WAL. Idempotent: replaying an already-applied record just rewrites
    /// the same bytes. Runs before the store is otherwise usable, so it
    /// takes the raw file/wal handles rather than `&self`.
    fn recover(data_file: &mut File, wal: &mut Wal) -> Result<()> {
        let records = wal.replay()?;
        if records.is_empty() {
            return Ok(());
        }
        info!(count = records.len(), "recovering paged store from WAL");
        for record in &records {
            if record.kind != WalOpKind::PageWrite {
                continue;
            }
            let offset = u64::from(record.page_id) * PAGE_SIZE as u64;
            data_file.seek(SeekFrom::Start(offset)).map_err(Error::Io)?;
            data_file.write_all(&record.payload).map_err(Error::Io)?;
        }
        data_file.sync_all().map_err(Error::Io)?;
        wal.checkpoint(0)?;
        let before_seq = wal.next_seq();
        wal.truncate(before_seq)?;
        Ok(())
    }

    /// Reads a page by id, consulting the buffer cache first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `id` is beyond the allocated page
    /// count, or [`Error::ChecksumMismatch`]/[`Error::Corrupt`] on a
    /// damaged page.
    pub fn read_page(&self, id: u32) -> Result<Page> {
        if let Some(page) = self.cache.get(id) {
            return Ok(page);
        }
        let page_count = self.header.read().page_count;
        if id >= page_count {
            return Err(Error::OutOfRange(format!(
                "page {id} does not exist (page_count={page_count})"
            )));
        }
        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut file = self.data_file.lock();
            file.seek(SeekFrom::Start(u64::from(id) * PAGE_SIZE as u64))
                .map_err(Error::Io)?;
            file.read_exact(&mut buf).map_err(Error::Io)?;
        }
        let page = Page::from_bytes(&buf)?;
        page.verify_checksum()?;
        self.cache.insert(page.clone());
        Ok(page)
    }

    /// Writes a page: logs the full page image to the WAL and flushes it,
    /// then applies the write to the data file, then updates the cache.
    /// This ordering is the "log before write" discipline that makes crash
    /// recovery possible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn write_page(&self, mut page: Page) -> Result<()> {
        page.seal();
        let bytes = page.to_bytes();

        self.wal.lock().append_page_write(page.id, &bytes)?;

        {
            let mut file = self.data_file.lock();
            file.seek(SeekFrom::Start(u64::from(page.id) * PAGE_SIZE as u64))
                .map_err(Error::Io)?;
            file.write_all(&bytes).map_err(Error::Io)?;
        }

        self.cache.insert(page);
        Ok(())
    }

    /// Allocates a new page, reusing a freed page id if the free list is
    /// non-empty, otherwise extending the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn allocate_page(&self, kind: PageKind) -> Result<Page> {
        let mut reused = None;
        loop {
            let head = self.header.read().free_list_head;
            if head == 0 {
                break;
            }
            let free_page = self.read_page(head)?;
            let next_free = u32::from_le_bytes(free_page.payload[0..4].try_into().unwrap());
            let mut header = self.header.write();
            if header.free_list_head != head {
                // Another allocation raced us and already claimed this id; retry.
                continue;
            }
            header.free_list_head = next_free;
            reused = Some(head);
            break;
        }

        let id = match reused {
            Some(id) => id,
            None => {
                let id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
                let mut header = self.header.write();
                header.page_count = header.page_count.max(id + 1);
                id
            }
        };

        self.flush_header()?;
        Ok(Page::empty(id, kind))
    }

    /// Returns a page to the free list for reuse by a future
    /// [`PagedStorage::allocate_page`] call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn free_page(&self, id: u32) -> Result<()> {
        let mut page = Page::empty(id, PageKind::Free);
        let next = self.header.read().free_list_head;
        page.payload[0..4].copy_from_slice(&next.to_le_bytes());
        self.write_page(page)?;
        self.header.write().free_list_head = id;
        self.cache.invalidate(id);
        self.flush_header()
    }

    fn flush_header(&self) -> Result<()> {
        let mut header = *self.header.read();
        header.modified_at = now_epoch_secs();
        *self.header.write() = header;
        let mut page = Page::empty(0, PageKind::Header);
        page.set_payload(&header.to_payload())?;
        self.write_page(page)
    }

    /// Fsyncs the data file and checkpoints + truncates the WAL, making the
    /// current state durable without relying on log replay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn flush(&self) -> Result<()> {
        self.data_file.lock().sync_all().map_err(Error::Io)?;
        let mut wal = self.wal.lock();
        wal.checkpoint(0)?;
        let before_seq = wal.next_seq();
        wal.truncate(before_seq)?;
        debug!(path = %self.path.display(), "paged store flushed");
        Ok(())
    }

    /// Current page count, free-list size, and cache/WAL counters.
    #[must_use]
    pub fn stats(&self) -> StorageStats {
        let header = *self.header.read();
        let mut free_pages = 0u32;
        let mut cursor = header.free_list_head;
        while cursor != 0 {
            free_pages += 1;
            match self.read_page(cursor) {
                Ok(p) => cursor = u32::from_le_bytes(p.payload[0..4].try_into().unwrap()),
                Err(_) => break,
            }
        }
        StorageStats {
            page_count: header.page_count,
            free_pages,
            cache: self.cache.stats(),
            wal_next_seq: self.wal.lock().next_seq(),
        }
    }

    /// Directory this store is rooted at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PagedStorage::open(dir.path(), 16).unwrap();

        let mut page = storage.allocate_page(PageKind::Data).unwrap();
        page.set_payload(b"hello world").unwrap();
        let id = page.id;
        storage.write_page(page).unwrap();

        let read_back = storage.read_page(id).unwrap();
        assert_eq!(read_back.data(), b"hello world");
    }

    #[test]
    fn free_then_allocate_reuses_id() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PagedStorage::open(dir.path(), 16).unwrap();

        let page = storage.allocate_page(PageKind::Data).unwrap();
        let id = page.id;
        storage.write_page(page).unwrap();
        storage.free_page(id).unwrap();

        let reused = storage.allocate_page(PageKind::Data).unwrap();
        assert_eq!(reused.id, id);
    }

    #[test]
    fn reopen_after_flush_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let id;
        {
            let storage = PagedStorage::open(dir.path(), 16).unwrap();
            let mut page = storage.allocate_page(PageKind::Data).unwrap();
            page.set_payload(b"durable").unwrap();
            id = page.id;
            storage.write_page(page).unwrap();
            storage.flush().unwrap();
        }
        let storage = PagedStorage::open(dir.path(), 16).unwrap();
        let page = storage.read_page(id).unwrap();
        assert_eq!(page.data(), b"durable");
    }

    #[test]
    fn reopen_replays_unflushed_wal() {
        let dir = tempfile::tempdir().unwrap();
        let id;
        {
            let storage = PagedStorage::open(dir.path(), 16).unwrap();
            let mut page = storage.allocate_page(PageKind::Data).unwrap();
            page.set_payload(b"from-wal").unwrap();
            id = page.id;
            // write_page logs + applies directly (no OS buffering layer to lose),
            // so this also exercises that recovery on open is a no-op/idempotent.
            storage.write_page(page).unwrap();
        }
        let storage = PagedStorage::open(dir.path(), 16).unwrap();
        let page = storage.read_page(id).unwrap();
        assert_eq!(page.data(), b"from-wal");
    }

    #[test]
    fn read_past_page_count_is_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PagedStorage::open(dir.path(), 16).unwrap();
        assert!(matches!(
            storage.read_page(999),
            Err(Error::OutOfRange(_))
        ));
    }
}
