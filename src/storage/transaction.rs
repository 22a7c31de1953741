//! Shadow-map transactions over a [`PagedStorage`].
//!
//! A transaction reads through to the underlying store but buffers every
//! write in memory; nothing is visible to other readers until `commit`.

use super::page::Page;
use super::pager::PagedStorage;
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

/// A single read/write transaction against a [`PagedStorage`].
///
/// Dropping an active transaction without calling `commit` or `rollback`
/// discards its shadow writes silently; writes only become visible through
/// an explicit `commit`, never implicitly on drop.
pub struct Transaction<'a> {
    storage: &'a PagedStorage,
    shadow: FxHashMap<u32, Page>,
    read_only: bool,
    active: bool,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(storage: &'a PagedStorage, read_only: bool) -> Self {
        Self {
            storage,
            shadow: FxHashMap::default(),
            read_only,
            active: true,
        }
    }

    /// Reads a page, preferring this transaction's own uncommitted writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TxInactive`] if the transaction already committed
    /// or rolled back, otherwise propagates [`PagedStorage::read_page`]'s
    /// errors.
    pub fn read_page(&self, id: u32) -> Result<Page> {
        self.ensure_active()?;
        if let Some(page) = self.shadow.get(&id) {
            return Ok(page.clone());
        }
        self.storage.read_page(id)
    }

    /// Buffers a page write in this transaction's shadow map; nothing is
    /// written to the underlying store until [`Transaction::commit`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] for a read-only transaction or
    /// [`Error::TxInactive`] if already finished.
    pub fn write_page(&mut self, page: Page) -> Result<()> {
        self.ensure_active()?;
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.shadow.insert(page.id, page);
        Ok(())
    }

    /// Allocates a new page through the underlying store. Allocation isn't
    /// shadowed (page ids must stay globally unique even across concurrent
    /// transactions), but the returned page's contents are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`]/[`Error::TxInactive`], or propagates the
    /// underlying allocation error.
    pub fn allocate_page(&mut self, kind: super::page::PageKind) -> Result<Page> {
        self.ensure_active()?;
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let page = self.storage.allocate_page(kind)?;
        self.shadow.insert(page.id, page.clone());
        Ok(page)
    }

    /// Applies every shadowed write to the underlying store, in page-id
    /// order for determinism, then marks the transaction finished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TxInactive`] if already finished, otherwise
    /// propagates [`PagedStorage::write_page`]'s errors. A failure partway
    /// through leaves some pages committed and the transaction consumed;
    /// callers needing all-or-nothing durability across a crash should
    /// bracket commits with [`PagedStorage::flush`].
    pub fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        let mut ids: Vec<u32> = self.shadow.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(page) = self.shadow.remove(&id) {
                self.storage.write_page(page)?;
            }
        }
        self.active = false;
        Ok(())
    }

    /// Discards all shadowed writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TxInactive`] if already finished.
    pub fn rollback(mut self) -> Result<()> {
        self.ensure_active()?;
        self.shadow.clear();
        self.active = false;
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::TxInactive)
        }
    }
}

impl PagedStorage {
    /// Begins a read/write transaction.
    #[must_use]
    pub fn begin_tx(&self) -> Transaction<'_> {
        Transaction::new(self, false)
    }

    /// Begins a read-only transaction; `write_page`/`allocate_page` on it
    /// always fail with [`Error::ReadOnly`].
    #[must_use]
    pub fn begin_read_tx(&self) -> Transaction<'_> {
        Transaction::new(self, true)
    }
}
