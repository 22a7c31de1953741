//! Write-ahead log: every page mutation is appended here before it is
//! applied to the data file ("log before write", spec §4.4).

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Kind of operation a WAL record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalOpKind {
    /// A full page image was written.
    PageWrite = 1,
    /// A checkpoint marker; everything before it is durable in the data file.
    Checkpoint = 2,
}

impl WalOpKind {
    fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(Self::PageWrite),
            2 => Ok(Self::Checkpoint),
            other => Err(Error::Corrupt(format!("unknown WAL op kind {other}"))),
        }
    }
}

/// One WAL record: a monotonically increasing sequence number, the kind of
/// operation, the page it touches (0 for checkpoint markers), the millisecond
/// timestamp it was appended at, the raw page bytes, and a CRC32 checksum.
///
/// Wire layout is `seq, kind, page_id, ts, crc32, data_len, data`: the crc32
/// sits ahead of the variable-length payload so a reader can validate the
/// fixed-size header fields before deciding whether to buffer the payload,
/// but it is computed over the whole logical record (including `data`).
#[derive(Debug, Clone)]
pub struct WalRecord {
    /// Monotonically increasing log sequence number.
    pub seq: u64,
    /// What this record describes.
    pub kind: WalOpKind,
    /// Page id this record applies to.
    pub page_id: u32,
    /// Milliseconds since the Unix epoch when this record was appended.
    pub ts: i64,
    /// Full page image (empty for checkpoint markers).
    pub payload: Vec<u8>,
    /// CRC32 over `seq`/`kind`/`page_id`/`ts`/`payload`.
    pub crc32: u32,
}

impl WalRecord {
    fn compute_crc32(seq: u64, kind: WalOpKind, page_id: u32, ts: i64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&seq.to_le_bytes());
        hasher.update(&[kind as u8]);
        hasher.update(&page_id.to_le_bytes());
        hasher.update(&ts.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }

    fn new(seq: u64, kind: WalOpKind, page_id: u32, payload: Vec<u8>) -> Self {
        let ts = now_epoch_millis();
        let crc32 = Self::compute_crc32(seq, kind, page_id, ts, &payload);
        Self {
            seq,
            kind,
            page_id,
            ts,
            payload,
            crc32,
        }
    }

    fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.seq.to_le_bytes())?;
        w.write_all(&[self.kind as u8])?;
        w.write_all(&self.page_id.to_le_bytes())?;
        w.write_all(&self.ts.to_le_bytes())?;
        w.write_all(&self.crc32.to_le_bytes())?;
        let len = u32::try_from(self.payload.len()).unwrap_or(u32::MAX);
        w.write_all(&len.to_le_bytes())?;
        w.write_all(&self.payload)?;
        Ok(())
    }

    /// Reads one record from `r`. Returns `Ok(None)` at a clean EOF (no
    /// bytes read at all); any other truncation is treated as a torn
    /// trailing write and also yields `Ok(None)` so replay can stop there.
    fn read_from(r: &mut impl Read) -> Result<Option<Self>> {
        let mut seq_buf = [0u8; 8];
        match r.read_exact(&mut seq_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        }
        let seq = u64::from_le_bytes(seq_buf);

        let mut kind_buf = [0u8; 1];
        if r.read_exact(&mut kind_buf).is_err() {
            return Ok(None);
        }
        let kind = match WalOpKind::from_u8(kind_buf[0]) {
            Ok(k) => k,
            Err(_) => return Ok(None),
        };

        let mut page_id_buf = [0u8; 4];
        if r.read_exact(&mut page_id_buf).is_err() {
            return Ok(None);
        }
        let page_id = u32::from_le_bytes(page_id_buf);

        let mut ts_buf = [0u8; 8];
        if r.read_exact(&mut ts_buf).is_err() {
            return Ok(None);
        }
        let ts = i64::from_le_bytes(ts_buf);

        let mut crc_buf = [0u8; 4];
        if r.read_exact(&mut crc_buf).is_err() {
            return Ok(None);
        }
        let crc32 = u32::from_le_bytes(crc_buf);

        let mut len_buf = [0u8; 4];
        if r.read_exact(&mut len_buf).is_err() {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        if r.read_exact(&mut payload).is_err() {
            return Ok(None);
        }

        let expected = Self::compute_crc32(seq, kind, page_id, ts, &payload);
        if expected != crc32 {
            warn!(seq, page_id, "WAL record failed checksum, stopping replay here");
            return Ok(None);
        }

        Ok(Some(Self {
            seq,
            kind,
            page_id,
            ts,
            payload,
            crc32,
        }))
    }
}

/// Append-only write-ahead log backing a paged store.
pub struct Wal {
    path: PathBuf,
    writer: BufWriter<File>,
    next_seq: AtomicU64,
}

impl Wal {
    /// Opens (creating if absent) the WAL file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Error::Io)?;
        let next_seq = Self::last_seq_in(&path)?.map_or(1, |s| s + 1);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            next_seq: AtomicU64::new(next_seq),
        })
    }

    fn last_seq_in(path: &Path) -> Result<Option<u64>> {
        let mut last = None;
        for record in Self::replay_records(path)? {
            last = Some(record.seq);
        }
        Ok(last)
    }

    /// Appends a page-write record and flushes the OS buffer, but does not
    /// fsync; callers that need durability across a power loss should call
    /// [`Wal::sync`] at transaction/checkpoint boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on write failure.
    pub fn append_page_write(&mut self, page_id: u32, page_bytes: &[u8]) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let record = WalRecord::new(seq, WalOpKind::PageWrite, page_id, page_bytes.to_vec());
        record.write_to(&mut self.writer).map_err(Error::Io)?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(seq)
    }

    /// Appends a checkpoint marker carrying `page_id`, the page whose
    /// durability this checkpoint anchors (typically the header page).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on write failure.
    pub fn checkpoint(&mut self, page_id: u32) -> Result<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let record = WalRecord::new(seq, WalOpKind::Checkpoint, page_id, Vec::new());
        record.write_to(&mut self.writer).map_err(Error::Io)?;
        self.sync()?;
        Ok(seq)
    }

    /// The sequence number that will be assigned to the next appended
    /// record.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    /// Fsyncs the underlying file, guaranteeing durability of everything
    /// appended so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on sync failure.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Io)?;
        self.writer.get_ref().sync_all().map_err(Error::Io)
    }

    /// Replays all valid records from `path` in order, in isolation from
    /// any open writer. Used both by [`Wal::open`] (to recover `next_seq`)
    /// and by the pager during crash recovery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened.
    pub fn replay_records(path: impl AsRef<Path>) -> Result<Vec<WalRecord>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).map_err(Error::Io)?;
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        while let Some(record) = WalRecord::read_from(&mut reader)? {
            records.push(record);
        }
        debug!(count = records.len(), "replayed WAL records");
        Ok(records)
    }

    /// Replays this WAL's own file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn replay(&self) -> Result<Vec<WalRecord>> {
        Self::replay_records(&self.path)
    }

    /// Rewrites the log file to contain only records with `seq >= before_seq`,
    /// via a temp-file-then-rename atomic replace. If nothing is retained,
    /// the sequence counter resets to 1; otherwise it is left untouched,
    /// since kept records still occupy the sequence range up to `next_seq`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on file-system failure.
    pub fn truncate(&mut self, before_seq: u64) -> Result<()> {
        self.writer.flush().map_err(Error::Io)?;
        let kept: Vec<WalRecord> = self
            .replay()?
            .into_iter()
            .filter(|r| r.seq >= before_seq)
            .collect();

        let tmp_path = self.path.with_extension("log.tmp");
        {
            let tmp_file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(Error::Io)?;
            let mut tmp_writer = BufWriter::new(tmp_file);
            for record in &kept {
                record.write_to(&mut tmp_writer).map_err(Error::Io)?;
            }
            tmp_writer.flush().map_err(Error::Io)?;
            tmp_writer.get_ref().sync_all().map_err(Error::Io)?;
        }
        std::fs::rename(&tmp_path, &self.path).map_err(Error::Io)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::Io)?;
        self.writer = BufWriter::new(file);
        if kept.is_empty() {
            self.next_seq.store(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_replay_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append_page_write(1, &[1, 2, 3]).unwrap();
        wal.append_page_write(2, &[4, 5, 6]).unwrap();
        wal.sync().unwrap();

        let records = wal.replay().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page_id, 1);
        assert_eq!(records[1].page_id, 2);
        assert_eq!(records[1].payload, vec![4, 5, 6]);
    }

    #[test]
    fn replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append_page_write(1, &[9]).unwrap();
        wal.sync().unwrap();

        let first = wal.replay().unwrap();
        let second = wal.replay().unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].seq, second[0].seq);
    }

    #[test]
    fn truncate_resets_log_and_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append_page_write(1, &[1]).unwrap();
        wal.checkpoint(0).unwrap();
        let before_seq = wal.next_seq();
        wal.truncate(before_seq).unwrap();

        assert!(wal.replay().unwrap().is_empty());
        let seq = wal.append_page_write(2, &[2]).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn truncate_retains_records_at_or_after_before_seq() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append_page_write(1, &[1]).unwrap();
        wal.append_page_write(2, &[2]).unwrap();
        let keep_from = wal.append_page_write(3, &[3]).unwrap();
        wal.append_page_write(4, &[4]).unwrap();
        wal.sync().unwrap();

        wal.truncate(keep_from).unwrap();

        let records = wal.replay().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].page_id, 3);
        assert_eq!(records[1].page_id, 4);
        assert_eq!(wal.next_seq(), 5);
    }

    #[test]
    fn checkpoint_carries_page_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.checkpoint(7).unwrap();

        let records = wal.replay().unwrap();
        assert_eq!(records[0].kind, WalOpKind::Checkpoint);
        assert_eq!(records[0].page_id, 7);
    }

    #[test]
    fn corrupted_tail_record_is_dropped_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append_page_write(1, &[1, 2, 3]).unwrap();
            wal.sync().unwrap();
        }
        // Simulate a torn write: append a few garbage bytes after a clean record.
        {
            use std::io::Write as _;
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0xFF, 0xFF, 0xFF]).unwrap();
        }
        let records = Wal::replay_records(&path).unwrap();
        assert_eq!(records.len(), 1);
    }
}
