//! Fixed-size pages, the unit of I/O for the paged storage engine.

use crate::error::{Error, Result};

/// Fixed page size in bytes (spec §4.2).
pub const PAGE_SIZE: usize = 4096;

/// Bytes reserved for the page header (id/kind/size/flags/lsn/checksum);
/// the remainder of the page is payload.
pub const PAGE_HEADER_SIZE: usize = 32;

/// Usable payload bytes per page.
pub const PAGE_PAYLOAD_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Kind of content a page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageKind {
    /// Reserved for page 0 (the file header).
    Header = 0,
    /// Ordinary data page.
    Data = 1,
    /// A page on the free list, awaiting reuse.
    Free = 2,
}

impl PageKind {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Self::Header),
            1 => Ok(Self::Data),
            2 => Ok(Self::Free),
            other => Err(Error::Corrupt(format!("unknown page kind {other}"))),
        }
    }
}

/// A single fixed-size page (spec §3).
///
/// Pages are exclusively owned by the storage engine; callers (including
/// transactions) always receive copies, never references into the cache.
#[derive(Debug, Clone)]
pub struct Page {
    /// Page id; 0 is reserved for the file header.
    pub id: u32,
    /// Content kind.
    pub kind: PageKind,
    /// Number of meaningful payload bytes (<= `PAGE_PAYLOAD_SIZE`).
    pub size: u16,
    /// Reserved bit flags.
    pub flags: u16,
    /// Log sequence number of the WAL record that last wrote this page.
    pub lsn: u64,
    /// CRC32 checksum of `kind`/`size`/`flags`/`lsn`/`payload`.
    pub checksum: u32,
    /// Payload bytes, always `PAGE_PAYLOAD_SIZE` long (padded with zeros).
    pub payload: Vec<u8>,
}

impl Page {
    /// Creates a new, empty data page with the given id.
    #[must_use]
    pub fn empty(id: u32, kind: PageKind) -> Self {
        Self {
            id,
            kind,
            size: 0,
            flags: 0,
            lsn: 0,
            checksum: 0,
            payload: vec![0u8; PAGE_PAYLOAD_SIZE],
        }
    }

    /// Replaces the payload with `data`, zero-padding to `PAGE_PAYLOAD_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `data` is larger than a page can hold.
    pub fn set_payload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_PAYLOAD_SIZE {
            return Err(Error::OutOfRange(format!(
                "payload of {} bytes exceeds page capacity of {}",
                data.len(),
                PAGE_PAYLOAD_SIZE
            )));
        }
        self.payload.clear();
        self.payload.extend_from_slice(data);
        self.payload.resize(PAGE_PAYLOAD_SIZE, 0);
        self.size = data.len() as u16;
        Ok(())
    }

    /// Returns the meaningful prefix of the payload (`payload[..size]`).
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.size as usize]
    }

    /// Recomputes and stores this page's checksum.
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Computes the CRC32 checksum over kind/size/flags/lsn/payload.
    #[must_use]
    pub fn compute_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&[self.kind as u8]);
        hasher.update(&self.size.to_le_bytes());
        hasher.update(&self.flags.to_le_bytes());
        hasher.update(&self.lsn.to_le_bytes());
        hasher.update(&self.payload);
        hasher.finalize()
    }

    /// Validates that the stored checksum matches the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChecksumMismatch`] on mismatch.
    pub fn verify_checksum(&self) -> Result<()> {
        if self.compute_checksum() == self.checksum {
            Ok(())
        } else {
            Err(Error::ChecksumMismatch)
        }
    }

    /// Serializes this page to exactly `PAGE_SIZE` bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PAGE_SIZE] {
        let mut buf = [0u8; PAGE_SIZE];
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4] = self.kind as u8;
        buf[5..7].copy_from_slice(&self.size.to_le_bytes());
        buf[7..9].copy_from_slice(&self.flags.to_le_bytes());
        buf[9..17].copy_from_slice(&self.lsn.to_le_bytes());
        buf[17..21].copy_from_slice(&self.checksum.to_le_bytes());
        // 21..32 reserved/padding
        buf[PAGE_HEADER_SIZE..].copy_from_slice(&self.payload);
        buf
    }

    /// Parses a page from exactly `PAGE_SIZE` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] if the page kind is unrecognized.
    pub fn from_bytes(buf: &[u8; PAGE_SIZE]) -> Result<Self> {
        let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let kind = PageKind::from_u8(buf[4])?;
        let size = u16::from_le_bytes(buf[5..7].try_into().unwrap());
        let flags = u16::from_le_bytes(buf[7..9].try_into().unwrap());
        let lsn = u64::from_le_bytes(buf[9..17].try_into().unwrap());
        let checksum = u32::from_le_bytes(buf[17..21].try_into().unwrap());
        let payload = buf[PAGE_HEADER_SIZE..].to_vec();
        Ok(Self {
            id,
            kind,
            size,
            flags,
            lsn,
            checksum,
            payload,
        })
    }
}
