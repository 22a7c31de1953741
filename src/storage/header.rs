//! The file header occupying page 0 of a paged store.

use crate::error::{Error, Result};
use crate::storage::page::PAGE_PAYLOAD_SIZE;

const MAGIC: &[u8; 8] = b"VITTORIA";
const FORMAT_VERSION: u16 = 1;

/// Metadata describing the layout of a paged data file, persisted in the
/// payload of page 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version; bumped on incompatible layout changes.
    pub version: u16,
    /// Fixed page size this file was created with.
    pub page_size: u32,
    /// Total number of pages allocated in the file, including page 0.
    pub page_count: u32,
    /// Head of the free-list linked through `Page::payload`'s first 4 bytes.
    pub free_list_head: u32,
    /// Unix epoch seconds at creation time.
    pub created_at: u64,
    /// Unix epoch seconds of the last successful flush.
    pub modified_at: u64,
}

impl FileHeader {
    /// Builds a fresh header for a newly created store.
    #[must_use]
    pub fn new(page_size: u32, now: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            page_size,
            page_count: 1,
            free_list_head: 0,
            created_at: now,
            modified_at: now,
        }
    }

    /// Serializes into a page-0 payload buffer.
    #[must_use]
    pub fn to_payload(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_PAYLOAD_SIZE);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.page_size.to_le_bytes());
        buf.extend_from_slice(&self.page_count.to_le_bytes());
        buf.extend_from_slice(&self.free_list_head.to_le_bytes());
        buf.extend_from_slice(&self.created_at.to_le_bytes());
        buf.extend_from_slice(&self.modified_at.to_le_bytes());
        buf
    }

    /// Parses a header out of a page-0 payload buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] if the magic bytes don't match.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 38 || &payload[0..8] != MAGIC {
            return Err(Error::Corrupt("file header magic mismatch".into()));
        }
        let version = u16::from_le_bytes(payload[8..10].try_into().unwrap());
        let page_size = u32::from_le_bytes(payload[10..14].try_into().unwrap());
        let page_count = u32::from_le_bytes(payload[14..18].try_into().unwrap());
        let free_list_head = u32::from_le_bytes(payload[18..22].try_into().unwrap());
        let created_at = u64::from_le_bytes(payload[22..30].try_into().unwrap());
        let modified_at = u64::from_le_bytes(payload[30..38].try_into().unwrap());
        Ok(Self {
            version,
            page_size,
            page_count,
            free_list_head,
            created_at,
            modified_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_payload() {
        let header = FileHeader::new(4096, 1_700_000_000);
        let payload = header.to_payload();
        let parsed = FileHeader::from_payload(&payload).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 64];
        assert!(matches!(
            FileHeader::from_payload(&bytes),
            Err(Error::Corrupt(_))
        ));
    }
}
