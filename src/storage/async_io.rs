//! Asynchronous front-end over [`PagedStorage`] (spec §4.6).
//!
//! Operations are submitted to a bounded queue and executed by a pool of
//! blocking worker tasks, so a slow disk never stalls the caller's async
//! executor. Writes are additionally coalesced into batches by size or by
//! a flush interval, whichever comes first. When `config.enabled` is false
//! the engine skips the queue and worker pool entirely, running every
//! operation synchronously on the caller's own task.

use super::page::{Page, PageKind};
use super::pager::PagedStorage;
use crate::config::AsyncIoConfig;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

/// One unit of work submitted to the engine.
enum Op {
    Read {
        page_id: u32,
        reply: oneshot::Sender<Result<Page>>,
    },
    Write {
        page: Page,
        reply: oneshot::Sender<Result<()>>,
    },
    Allocate {
        kind: PageKind,
        reply: oneshot::Sender<Result<Page>>,
    },
    Sync {
        reply: oneshot::Sender<Result<()>>,
    },
}

#[derive(Clone, Copy)]
enum OpKind {
    Read,
    Write,
    Allocate,
    Sync,
}

/// Per-operation-kind counters: how many were queued/completed/errored, and
/// the running total latency used to derive an average on snapshot.
#[derive(Debug, Default)]
struct KindCounters {
    queued: AtomicU64,
    completed: AtomicU64,
    errors: AtomicU64,
    latency_ns_total: AtomicU64,
}

impl KindCounters {
    fn record(&self, started: Instant, is_err: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.latency_ns_total.fetch_add(latency_ns, Ordering::Relaxed);
        if is_err {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self, elapsed_secs: f64) -> OpKindStats {
        let completed = self.completed.load(Ordering::Relaxed);
        let avg_latency_ns = if completed == 0 {
            0
        } else {
            self.latency_ns_total.load(Ordering::Relaxed) / completed
        };
        let throughput_ops_per_sec = if elapsed_secs > 0.0 {
            completed as f64 / elapsed_secs
        } else {
            0.0
        };
        OpKindStats {
            queued: self.queued.load(Ordering::Relaxed),
            completed,
            errors: self.errors.load(Ordering::Relaxed),
            avg_latency_ns,
            throughput_ops_per_sec,
        }
    }
}

/// Queued/completed/error/latency/throughput counters for one operation kind.
#[derive(Debug, Clone, Default)]
pub struct OpKindStats {
    /// Operations of this kind submitted.
    pub queued: u64,
    /// Operations of this kind completed (successfully or not).
    pub completed: u64,
    /// Operations of this kind that completed with an error.
    pub errors: u64,
    /// Average submit-to-completion latency, in nanoseconds.
    pub avg_latency_ns: u64,
    /// Completed operations per second of engine uptime.
    pub throughput_ops_per_sec: f64,
}

/// Counters describing engine throughput, sampled by [`AsyncIoEngine::stats`].
#[derive(Debug, Clone)]
pub struct AsyncIoStats {
    /// When this engine was started.
    pub start_time: SystemTime,
    /// Read operation counters.
    pub read: OpKindStats,
    /// Write operation counters.
    pub write: OpKindStats,
    /// Allocate operation counters.
    pub allocate: OpKindStats,
    /// Sync operation counters.
    pub sync: OpKindStats,
    /// Operations rejected because the queue was full.
    pub rejected: u64,
    /// Write batches flushed.
    pub batches_flushed: u64,
}

struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A caller-held cancellation signal for a submitted operation. Cancelling
/// after the operation has already started executing has no effect; it only
/// pre-empts an operation still waiting in the queue or for its reply.
/// Cancelling before an operation starts waiting still takes effect, unlike
/// a bare [`Notify`]: an internal flag is checked up front.
#[derive(Clone)]
pub struct Cancellation(Arc<CancellationState>);

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// Creates a fresh, uncancelled signal.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(CancellationState {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }))
    }

    /// Cancels every operation currently or subsequently waiting on this
    /// signal.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }
}

/// Bounded-queue async front-end over a [`PagedStorage`].
///
/// Cloning is cheap: it shares the same queue and background workers.
#[derive(Clone)]
pub struct AsyncIoEngine {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<PagedStorage>,
    sender: Option<mpsc::Sender<Op>>,
    shutdown: Notify,
    shut_down: AtomicBool,
    rejected: AtomicU64,
    batches_flushed: AtomicU64,
    started_at: Instant,
    start_time: SystemTime,
    read: KindCounters,
    write: KindCounters,
    allocate: KindCounters,
    sync: KindCounters,
}

impl Inner {
    fn new(storage: Arc<PagedStorage>, sender: Option<mpsc::Sender<Op>>) -> Self {
        Self {
            storage,
            sender,
            shutdown: Notify::new(),
            shut_down: AtomicBool::new(false),
            rejected: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            started_at: Instant::now(),
            start_time: SystemTime::now(),
            read: KindCounters::default(),
            write: KindCounters::default(),
            allocate: KindCounters::default(),
            sync: KindCounters::default(),
        }
    }

    fn counters(&self, kind: OpKind) -> &KindCounters {
        match kind {
            OpKind::Read => &self.read,
            OpKind::Write => &self.write,
            OpKind::Allocate => &self.allocate,
            OpKind::Sync => &self.sync,
        }
    }
}

impl AsyncIoEngine {
    /// Starts the engine over `storage`. If `config.enabled` is `true`,
    /// spawns the background dispatch loop, which hands blocking work off
    /// to tokio's blocking pool over `storage`. If `false`, every operation
    /// runs synchronously on the caller's own task and no loop is spawned.
    #[must_use]
    pub fn start(storage: Arc<PagedStorage>, config: AsyncIoConfig) -> Self {
        if !config.enabled {
            return Self {
                inner: Arc::new(Inner::new(storage, None)),
            };
        }

        let (sender, receiver) = mpsc::channel(config.queue_depth);
        let inner = Arc::new(Inner::new(storage.clone(), Some(sender)));

        let dispatch_inner = inner.clone();
        tokio::spawn(Self::dispatch_loop(storage, config, receiver, dispatch_inner));

        Self { inner }
    }

    async fn dispatch_loop(
        storage: Arc<PagedStorage>,
        config: AsyncIoConfig,
        mut receiver: mpsc::Receiver<Op>,
        inner: Arc<Inner>,
    ) {
        let mut pending_writes: Vec<(Page, Instant, oneshot::Sender<Result<()>>)> = Vec::new();
        let mut ticker = interval(Duration::from_millis(config.flush_interval_ms));

        loop {
            tokio::select! {
                biased;
                () = inner.shutdown.notified() => {
                    inner.shut_down.store(true, Ordering::Release);
                    Self::flush_writes(&storage, &mut pending_writes, &inner).await;
                    debug!("async io engine shut down");
                    return;
                }
                maybe_op = receiver.recv() => {
                    match maybe_op {
                        Some(Op::Write { page, reply }) => {
                            pending_writes.push((page, Instant::now(), reply));
                            if pending_writes.len() >= config.batch_size {
                                Self::flush_writes(&storage, &mut pending_writes, &inner).await;
                            }
                        }
                        Some(other) => {
                            Self::dispatch_one(storage.clone(), other, &inner).await;
                        }
                        None => {
                            inner.shut_down.store(true, Ordering::Release);
                            Self::flush_writes(&storage, &mut pending_writes, &inner).await;
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    Self::flush_writes(&storage, &mut pending_writes, &inner).await;
                }
            }
        }
    }

    async fn flush_writes(
        storage: &Arc<PagedStorage>,
        pending: &mut Vec<(Page, Instant, oneshot::Sender<Result<()>>)>,
        inner: &Arc<Inner>,
    ) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        let storage = storage.clone();
        let results = tokio::task::spawn_blocking(move || {
            batch
                .into_iter()
                .map(|(page, started, reply)| (storage.write_page(page), started, reply))
                .collect::<Vec<_>>()
        })
        .await;

        match results {
            Ok(results) => {
                for (result, started, reply) in results {
                    inner.write.record(started, result.is_err());
                    let _ = reply.send(result);
                }
                inner.batches_flushed.fetch_add(1, Ordering::Relaxed);
            }
            Err(join_err) => {
                warn!(%join_err, "write batch task panicked");
            }
        }
    }

    async fn dispatch_one(storage: Arc<PagedStorage>, op: Op, inner: &Arc<Inner>) {
        match op {
            Op::Read { page_id, reply } => {
                let started = Instant::now();
                let result =
                    tokio::task::spawn_blocking(move || storage.read_page(page_id)).await;
                let result = result.unwrap_or_else(|e| Err(Error::Internal(e.to_string())));
                inner.read.record(started, result.is_err());
                let _ = reply.send(result);
            }
            Op::Allocate { kind, reply } => {
                let started = Instant::now();
                let result = tokio::task::spawn_blocking(move || storage.allocate_page(kind)).await;
                let result = result.unwrap_or_else(|e| Err(Error::Internal(e.to_string())));
                inner.allocate.record(started, result.is_err());
                let _ = reply.send(result);
            }
            Op::Sync { reply } => {
                let started = Instant::now();
                let result = tokio::task::spawn_blocking(move || storage.flush()).await;
                let result = result.unwrap_or_else(|e| Err(Error::Internal(e.to_string())));
                inner.sync.record(started, result.is_err());
                let _ = reply.send(result);
            }
            Op::Write { .. } => unreachable!("writes are handled by the batcher"),
        }
    }

    /// Runs one operation, either synchronously (`enabled == false`) or by
    /// submitting it to the queue and waiting for its reply, optionally
    /// racing a caller-provided [`Cancellation`].
    async fn run<T>(
        &self,
        kind: OpKind,
        cancel: Option<&Cancellation>,
        make_op: impl FnOnce(oneshot::Sender<Result<T>>) -> Op,
        run_inline: impl FnOnce(&PagedStorage) -> Result<T>,
    ) -> Result<T> {
        let inner = &*self.inner;
        if inner.shut_down.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }

        let counters = inner.counters(kind);
        let started = Instant::now();

        let Some(sender) = &inner.sender else {
            let result = run_inline(&inner.storage);
            counters.record(started, result.is_err());
            return result;
        };

        counters.queued.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();
        match sender.try_send(make_op(reply)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                inner.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(Error::QueueFull);
            }
            Err(TrySendError::Closed(_)) => {
                inner.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(Error::Shutdown);
            }
        }

        let result = if let Some(cancel) = cancel {
            if cancel.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                tokio::select! {
                    r = rx => r.map_err(|_| Error::Cancelled)?,
                    () = cancel.0.notify.notified() => Err(Error::Cancelled),
                }
            }
        } else {
            rx.await.map_err(|_| Error::Cancelled)?
        };
        counters.record(started, result.is_err());
        result
    }

    /// Reads a page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the engine has shut down,
    /// [`Error::QueueFull`] if the bounded queue has no room, or propagates
    /// the underlying read error.
    pub async fn read(&self, page_id: u32) -> Result<Page> {
        self.run(
            OpKind::Read,
            None,
            |reply| Op::Read { page_id, reply },
            |storage| storage.read_page(page_id),
        )
        .await
    }

    /// Like [`AsyncIoEngine::read`], but cancellable via `cancel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before the read
    /// completes, in addition to [`AsyncIoEngine::read`]'s errors.
    pub async fn read_cancellable(&self, page_id: u32, cancel: &Cancellation) -> Result<Page> {
        self.run(
            OpKind::Read,
            Some(cancel),
            |reply| Op::Read { page_id, reply },
            |storage| storage.read_page(page_id),
        )
        .await
    }

    /// Queues a page write; it is applied once its batch flushes (by size
    /// or by timer), or immediately if the engine is running inline.
    ///
    /// # Errors
    ///
    /// See [`AsyncIoEngine::read`].
    pub async fn write(&self, page: Page) -> Result<()> {
        let inline_page = page.clone();
        self.run(
            OpKind::Write,
            None,
            move |reply| Op::Write { page, reply },
            move |storage| storage.write_page(inline_page),
        )
        .await
    }

    /// Like [`AsyncIoEngine::write`], but cancellable via `cancel`.
    ///
    /// # Errors
    ///
    /// See [`AsyncIoEngine::read_cancellable`].
    pub async fn write_cancellable(&self, page: Page, cancel: &Cancellation) -> Result<()> {
        let inline_page = page.clone();
        self.run(
            OpKind::Write,
            Some(cancel),
            move |reply| Op::Write { page, reply },
            move |storage| storage.write_page(inline_page),
        )
        .await
    }

    /// Allocates a new page.
    ///
    /// # Errors
    ///
    /// See [`AsyncIoEngine::read`].
    pub async fn allocate(&self, kind: PageKind) -> Result<Page> {
        self.run(
            OpKind::Allocate,
            None,
            move |reply| Op::Allocate { kind, reply },
            move |storage| storage.allocate_page(kind),
        )
        .await
    }

    /// Like [`AsyncIoEngine::allocate`], but cancellable via `cancel`.
    ///
    /// # Errors
    ///
    /// See [`AsyncIoEngine::read_cancellable`].
    pub async fn allocate_cancellable(&self, kind: PageKind, cancel: &Cancellation) -> Result<Page> {
        self.run(
            OpKind::Allocate,
            Some(cancel),
            move |reply| Op::Allocate { kind, reply },
            move |storage| storage.allocate_page(kind),
        )
        .await
    }

    /// Forces an immediate flush of any pending write batch plus an fsync.
    ///
    /// # Errors
    ///
    /// See [`AsyncIoEngine::read`].
    pub async fn sync(&self) -> Result<()> {
        self.run(
            OpKind::Sync,
            None,
            |reply| Op::Sync { reply },
            |storage| storage.flush(),
        )
        .await
    }

    /// Signals the dispatch loop to flush remaining writes and stop. Once
    /// shut down, every further submission returns [`Error::Shutdown`].
    /// A no-op when the engine is running inline (`enabled == false`),
    /// since there is no loop to stop.
    pub fn shutdown(&self) {
        if self.inner.sender.is_some() {
            self.inner.shutdown.notify_one();
        } else {
            self.inner.shut_down.store(true, Ordering::Release);
        }
    }

    /// Snapshot of per-kind queued/completed/error/latency/throughput
    /// counters, plus rejected submissions, flushed batches, and start time.
    #[must_use]
    pub fn stats(&self) -> AsyncIoStats {
        let elapsed_secs = self.inner.started_at.elapsed().as_secs_f64();
        AsyncIoStats {
            start_time: self.inner.start_time,
            read: self.inner.read.snapshot(elapsed_secs),
            write: self.inner.write.snapshot(elapsed_secs),
            allocate: self.inner.allocate.snapshot(elapsed_secs),
            sync: self.inner.sync.snapshot(elapsed_secs),
            rejected: self.inner.rejected.load(Ordering::Relaxed),
            batches_flushed: self.inner.batches_flushed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AsyncIoConfig {
        AsyncIoConfig {
            enabled: true,
            workers: 2,
            queue_depth: 64,
            batch_size: 4,
            flush_interval_ms: 20,
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let engine = AsyncIoEngine::start(storage.clone(), test_config());

        let mut page = engine.allocate(PageKind::Data).await.unwrap();
        page.set_payload(b"async-hello").unwrap();
        let id = page.id;
        engine.write(page).await.unwrap();

        let read_back = engine.read(id).await.unwrap();
        assert_eq!(read_back.data(), b"async-hello");
        engine.shutdown();
    }

    #[tokio::test]
    async fn batch_size_triggers_flush_without_waiting_for_timer() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let engine = AsyncIoEngine::start(storage.clone(), test_config());

        let mut handles = Vec::new();
        for i in 0..4u8 {
            let mut page = engine.allocate(PageKind::Data).await.unwrap();
            page.set_payload(&[i]).unwrap();
            handles.push(engine.write(page));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stats = engine.stats();
        assert!(stats.batches_flushed >= 1);
        assert_eq!(stats.write.completed, 4);
        engine.shutdown();
    }

    #[tokio::test]
    async fn sync_forces_pending_batch_out() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let engine = AsyncIoEngine::start(storage.clone(), test_config());

        let mut page = engine.allocate(PageKind::Data).await.unwrap();
        page.set_payload(b"x").unwrap();
        let id = page.id;
        let write_fut = engine.write(page);
        engine.sync().await.unwrap();
        write_fut.await.unwrap();

        let read_back = engine.read(id).await.unwrap();
        assert_eq!(read_back.data(), b"x");
        engine.shutdown();
    }

    #[tokio::test]
    async fn disabled_engine_runs_inline_without_a_dispatch_loop() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let config = AsyncIoConfig {
            enabled: false,
            ..test_config()
        };
        let engine = AsyncIoEngine::start(storage.clone(), config);

        let mut page = engine.allocate(PageKind::Data).await.unwrap();
        page.set_payload(b"inline").unwrap();
        let id = page.id;
        engine.write(page).await.unwrap();

        let read_back = engine.read(id).await.unwrap();
        assert_eq!(read_back.data(), b"inline");
        assert_eq!(engine.stats().batches_flushed, 0);
    }

    #[tokio::test]
    async fn submission_after_shutdown_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let engine = AsyncIoEngine::start(storage.clone(), test_config());
        engine.shutdown();
        // Give the dispatch loop a moment to observe the shutdown signal.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(engine.read(0).await, Err(Error::Shutdown)));
    }

    #[tokio::test]
    async fn cancelling_before_reply_yields_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(PagedStorage::open(dir.path(), 16).unwrap());
        let engine = AsyncIoEngine::start(storage.clone(), test_config());
        let cancel = Cancellation::new();
        cancel.cancel();

        let result = engine.read_cancellable(0, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        engine.shutdown();
    }
}
