//! Fixed-stride, memory-mapped vector slab (spec §4.3).
//!
//! Each vector occupies `dimension * 4` bytes, 32-byte aligned so SIMD
//! kernels can load straight from the mapping. Slots are identified by a
//! dense `u32` row index; the collection layer owns the id -> row mapping.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::error;

#[cfg(unix)]
mod backend {
    use super::{Error, Result};
    use memmap2::MmapMut;
    use parking_lot::RwLock;
    use std::fs::File;

    pub struct Mapping(pub RwLock<MmapMut>);

    impl Mapping {
        pub fn open(file: &File) -> Result<Self> {
            // SAFETY: `file` is opened read/write and sized via `set_len`
            // before every map/remap, so the mapping always covers
            // allocated, zero-initialized storage.
            let mmap = unsafe { MmapMut::map_mut(file) }.map_err(Error::Io)?;
            Ok(Self(RwLock::new(mmap)))
        }

        pub fn remap(&self, file: &File) -> Result<()> {
            let mut guard = self.0.write();
            guard.flush().map_err(Error::Io)?;
            // SAFETY: see `open`.
            *guard = unsafe { MmapMut::map_mut(file) }.map_err(Error::Io)?;
            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod backend {
    use super::{Error, Result};
    use parking_lot::RwLock;
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom, Write};

    /// Buffered-I/O fallback for platforms without a `memmap2` Unix mapping
    /// path; slower, but keeps the fixed-stride slab semantics identical.
    pub struct Mapping(pub RwLock<Vec<u8>>);

    impl Mapping {
        pub fn open(file: &File) -> Result<Self> {
            let mut file = file.try_clone().map_err(Error::Io)?;
            let len = file.metadata().map_err(Error::Io)?.len() as usize;
            let mut buf = vec![0u8; len];
            file.seek(SeekFrom::Start(0)).map_err(Error::Io)?;
            file.read_exact(&mut buf).map_err(Error::Io)?;
            Ok(Self(RwLock::new(buf)))
        }

        pub fn remap(&self, file: &File) -> Result<()> {
            // Grow the in-memory buffer in place rather than re-reading the
            // file: the file may not yet reflect writes this backend has
            // only buffered in memory (persisted lazily by `flush`).
            let new_len = file.metadata().map_err(Error::Io)?.len() as usize;
            let mut buf = self.0.write();
            buf.resize(new_len, 0);
            Ok(())
        }

        pub fn persist(&self, file: &mut File) -> Result<()> {
            let buf = self.0.read();
            file.seek(SeekFrom::Start(0)).map_err(Error::Io)?;
            file.write_all(&buf).map_err(Error::Io)?;
            Ok(())
        }
    }
}

use backend::Mapping;

const INITIAL_SLOTS: u64 = 1024;
const GROWTH_FACTOR: u64 = 2;

/// Memory-mapped, fixed-stride vector storage.
pub struct MmapVectorStore {
    path: PathBuf,
    dimension: usize,
    stride: usize,
    file: File,
    mapping: Mapping,
    capacity_slots: AtomicU64,
    next_slot: AtomicUsize,
    remap_epoch: AtomicU64,
}

impl MmapVectorStore {
    /// Opens or creates a vector slab file at `path` for vectors of
    /// `dimension` dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stride = dimension * std::mem::size_of::<f32>();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(Error::Io)?;

        let len = file.metadata().map_err(Error::Io)?.len();
        let min_len = INITIAL_SLOTS * stride as u64;
        if len < min_len {
            file.set_len(min_len).map_err(Error::Io)?;
        }
        let capacity_slots = file.metadata().map_err(Error::Io)?.len() / stride.max(1) as u64;

        let mapping = Mapping::open(&file)?;

        Ok(Self {
            path,
            dimension,
            stride,
            file,
            mapping,
            capacity_slots: AtomicU64::new(capacity_slots),
            next_slot: AtomicUsize::new(0),
            remap_epoch: AtomicU64::new(0),
        })
    }

    /// Dimension every stored vector must match.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reserves a fresh slot and writes `values` into it, growing the
    /// backing file if needed. Returns the slot index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimMismatch`] if `values.len() != dimension`, or
    /// [`Error::Io`] on file-system failure.
    pub fn append(&self, values: &[f32]) -> Result<u32> {
        if values.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        let slot = self.next_slot.fetch_add(1, Ordering::SeqCst) as u64;
        self.ensure_capacity(slot + 1)?;
        self.write_slot(slot as u32, values)?;
        Ok(slot as u32)
    }

    /// Overwrites an existing slot in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimMismatch`] or [`Error::OutOfRange`].
    pub fn write_slot(&self, slot: u32, values: &[f32]) -> Result<()> {
        if values.len() != self.dimension {
            return Err(Error::DimMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }
        let offset = slot as usize * self.stride;
        self.with_mapping_mut(|bytes| {
            if offset + self.stride > bytes.len() {
                return Err(Error::OutOfRange(format!("slot {slot} out of bounds")));
            }
            let src = bytemuck_cast_f32(values);
            bytes[offset..offset + self.stride].copy_from_slice(src);
            Ok(())
        })
    }

    /// Copies a slot's values out of the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `slot` is beyond capacity.
    pub fn read_slot(&self, slot: u32) -> Result<Vec<f32>> {
        let offset = slot as usize * self.stride;
        self.with_mapping(|bytes| {
            if offset + self.stride > bytes.len() {
                return Err(Error::OutOfRange(format!("slot {slot} out of bounds")));
            }
            let raw = &bytes[offset..offset + self.stride];
            Ok(cast_to_f32_vec(raw))
        })
    }

    fn ensure_capacity(&self, required_slots: u64) -> Result<()> {
        let current = self.capacity_slots.load(Ordering::Acquire);
        if required_slots <= current {
            return Ok(());
        }
        let doubled = current.saturating_mul(GROWTH_FACTOR).max(1);
        let new_slots = doubled.max(required_slots);
        let new_len = new_slots * self.stride as u64;
        self.file.set_len(new_len).map_err(Error::Io)?;
        self.mapping.remap(&self.file)?;
        self.capacity_slots.store(new_slots, Ordering::Release);
        self.remap_epoch.fetch_add(1, Ordering::Release);
        Ok(())
    }

    #[cfg(unix)]
    fn with_mapping<T>(&self, f: impl FnOnce(&[u8]) -> Result<T>) -> Result<T> {
        f(&self.mapping.0.read())
    }

    #[cfg(unix)]
    fn with_mapping_mut<T>(&self, f: impl FnOnce(&mut [u8]) -> Result<T>) -> Result<T> {
        f(&mut self.mapping.0.write())
    }

    #[cfg(not(unix))]
    fn with_mapping<T>(&self, f: impl FnOnce(&[u8]) -> Result<T>) -> Result<T> {
        f(&self.mapping.0.read())
    }

    #[cfg(not(unix))]
    fn with_mapping_mut<T>(&self, f: impl FnOnce(&mut [u8]) -> Result<T>) -> Result<T> {
        f(&mut self.mapping.0.write())
    }

    /// Flushes the mapping to disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on failure.
    pub fn flush(&self) -> Result<()> {
        #[cfg(unix)]
        {
            self.mapping.0.write().flush().map_err(Error::Io)
        }
        #[cfg(not(unix))]
        {
            let mut file = self.file.try_clone().map_err(Error::Io)?;
            self.mapping.persist(&mut file)
        }
    }

    /// Path of the backing slab file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of slots ever appended (not necessarily all live — deletion
    /// is the caller's responsibility via its own id map).
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.next_slot.load(Ordering::Relaxed)
    }
}

impl Drop for MmapVectorStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            error!(?e, path = %self.path.display(), "failed to flush vector slab on drop");
        }
    }
}

fn bytemuck_cast_f32(values: &[f32]) -> &[u8] {
    // SAFETY: f32 has no padding/invalid bit patterns affecting byte
    // reinterpretation; the resulting slice's lifetime matches `values`.
    unsafe { std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values)) }
}

fn cast_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
