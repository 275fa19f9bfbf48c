//! Scan orchestration: one walker thread, a bounded size pool and a
//! coordinator task that owns the result set.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use cosmoclean_core::{
    MatchRecord, ScanError, ScanEvent, ScanRequest, ScanResult, ScanState, SymlinkPolicy,
};

use crate::aggregate::SizeAggregator;
use crate::delete::{DeletionHandle, start_deletion};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::progress::{ProgressTracker, ScanProgress};
use crate::registry::MatchRegistry;
use crate::walker::{Message, Walker};
use crate::{PROGRESS_CHANNEL_SIZE, SCAN_CHANNEL_SIZE};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Matches of the last completed scan, used to validate deletions.
#[derive(Debug)]
pub(crate) struct LastScan {
    pub root: PathBuf,
    pub registry: MatchRegistry,
}

/// State shared between a scanner and its running operation.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    busy: AtomicBool,
    state: AtomicU8,
    last_scan: RwLock<Option<Arc<LastScan>>>,
}

impl Shared {
    fn set_state(&self, state: ScanState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn set_last_scan(&self, last: Option<LastScan>) {
        *self.last_scan.write().unwrap_or_else(PoisonError::into_inner) = last.map(Arc::new);
    }

    pub(crate) fn last_scan(&self) -> Option<Arc<LastScan>> {
        self.last_scan
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Exclusive claim on a scanner; released on drop.
#[derive(Debug)]
pub(crate) struct BusyGuard {
    shared: Arc<Shared>,
}

impl BusyGuard {
    pub(crate) fn acquire(shared: &Arc<Shared>) -> Result<Self, ScanError> {
        shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScanError::Busy)?;
        Ok(Self {
            shared: Arc::clone(shared),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.shared.busy.store(false, Ordering::Release);
    }
}

/// Finds target folders and measures them.
///
/// A scanner runs one operation at a time: starting a scan or a deletion
/// while another is in progress fails with [`ScanError::Busy`].
pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    shared: Arc<Shared>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl Scanner {
    /// Create a scanner over the local filesystem.
    pub fn new() -> Self {
        Self::with_fs(LocalFileSystem)
    }

    /// Create a scanner over a custom filesystem.
    pub fn with_fs(fs: impl FileSystem) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            fs: Arc::new(fs),
            shared: Arc::new(Shared::default()),
            progress_tx,
        }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// State of the most recent scan.
    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Whether a scan or deletion is running.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Root of the last completed scan, if deletions are currently allowed.
    pub fn last_scan_root(&self) -> Option<PathBuf> {
        self.shared.last_scan().map(|last| last.root.clone())
    }

    /// Start a scan.
    ///
    /// Must be called from within a Tokio runtime, otherwise it fails with
    /// [`ScanError::NoRuntime`]. Fails with [`ScanError::InvalidRoot`] before
    /// any event is produced if the root is not a readable directory.
    ///
    /// The root check runs synchronously. On a multi-thread runtime it is
    /// wrapped in `block_in_place`; on a current-thread runtime it blocks the
    /// caller.
    pub fn scan(&self, request: ScanRequest) -> Result<ScanHandle, ScanError> {
        let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
        let guard = BusyGuard::acquire(&self.shared)?;

        // Canonicalizing a network root can block for a long time.
        let resolve = || self.fs.resolve_dir(&request.root);
        let resolved = match runtime.runtime_flavor() {
            RuntimeFlavor::MultiThread => tokio::task::block_in_place(resolve),
            _ => resolve(),
        };
        let root = resolved.map_err(|e| ScanError::invalid_root(&request.root, e.to_string()))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(request.workers.max(1))
            .thread_name(|i| format!("cosmoclean-size-{i}"))
            .build()
            .map_err(|e| ScanError::WorkerPool {
                message: e.to_string(),
            })?;

        self.shared.set_last_scan(None);
        self.shared.set_state(ScanState::Running);
        tracing::info!(
            root = %root.display(),
            targets = request.targets.len(),
            workers = request.workers,
            "starting scan"
        );

        let cancel = CancellationToken::new();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(SCAN_CHANNEL_SIZE);
        let dirs_walked = Arc::new(AtomicU64::new(0));

        let walker = Walker {
            fs: Arc::clone(&self.fs),
            targets: request.targets,
            cancel: cancel.clone(),
            tx: msg_tx.clone(),
            dirs_walked: Arc::clone(&dirs_walked),
        };
        let job_ctx = JobContext {
            fs: Arc::clone(&self.fs),
            symlink_policy: request.symlink_policy,
            cancel: cancel.clone(),
            tx: msg_tx,
        };
        let walk_root = root.clone();
        let walk_task = runtime.spawn_blocking(move || {
            walker.run(walk_root, |index, path| {
                let job = job_ctx.job(index, path);
                pool.spawn(move || job.run());
            });
        });

        let coordinator = Coordinator {
            root: root.clone(),
            records: Vec::new(),
            outstanding: 0,
            walk_errors: 0,
            walk_finished: false,
            tracker: ProgressTracker::new(PROGRESS_INTERVAL),
            dirs_walked,
            events: event_tx,
            progress_tx: self.progress_tx.clone(),
            cancel: cancel.clone(),
            shared: Arc::clone(&self.shared),
            guard,
        };
        runtime.spawn(coordinator.run(msg_rx, walk_task));

        Ok(ScanHandle {
            rx: event_rx,
            cancel,
            root,
        })
    }

    /// Delete folders reported by the last completed scan.
    ///
    /// The whole request is rejected without touching the filesystem if any
    /// path lies outside the last scan root or is not one of its matches.
    pub fn delete_selected<I, P>(&self, paths: I) -> Result<DeletionHandle, ScanError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        start_deletion(&self.fs, &self.shared, paths)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of events from a running scan.
///
/// Dropping the handle cancels the scan.
#[derive(Debug)]
pub struct ScanHandle {
    rx: mpsc::Receiver<ScanEvent>,
    cancel: CancellationToken,
    root: PathBuf,
}

impl ScanHandle {
    /// Receive the next event, or `None` once the terminal event was delivered.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        self.rx.recv().await
    }

    /// Request cancellation. A `Cancelled` event follows promptly.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this scan, e.g. for a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Canonical root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drain events and return the terminal one.
    pub async fn finish(mut self) -> Option<ScanEvent> {
        while let Some(event) = self.rx.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Convert into a [`tokio_stream::Stream`] of events.
    pub fn into_stream(self) -> ReceiverStream<ScanEvent> {
        ReceiverStream::new(self.rx)
    }
}

/// Everything a size job needs besides its target.
struct JobContext {
    fs: Arc<dyn FileSystem>,
    symlink_policy: SymlinkPolicy,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Message>,
}

impl JobContext {
    fn job(&self, index: usize, path: PathBuf) -> SizeJob {
        SizeJob {
            index,
            path,
            fs: Arc::clone(&self.fs),
            symlink_policy: self.symlink_policy,
            cancel: self.cancel.clone(),
            tx: self.tx.clone(),
        }
    }
}

struct SizeJob {
    index: usize,
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    symlink_policy: SymlinkPolicy,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Message>,
}

impl SizeJob {
    fn run(self) {
        if self.cancel.is_cancelled() {
            return;
        }

        let computed = catch_unwind(AssertUnwindSafe(|| {
            SizeAggregator::new(self.fs.as_ref(), self.symlink_policy)
                .with_cancel(&self.cancel)
                .compute_size(&self.path)
        }));
        let outcome = match computed {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(ScanError::Cancelled)) => return,
            Ok(Err(err)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "size computation failed"
                );
                Err(err.to_string())
            }
            Err(_) => Err("size worker panicked".to_string()),
        };

        let _ = self.tx.send(Message::SizeDone {
            index: self.index,
            outcome,
        });
    }
}

enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
    /// The event consumer went away.
    Abandoned,
}

/// Sole owner of the in-progress match records.
struct Coordinator {
    root: PathBuf,
    records: Vec<MatchRecord>,
    outstanding: usize,
    walk_errors: usize,
    walk_finished: bool,
    tracker: ProgressTracker,
    dirs_walked: Arc<AtomicU64>,
    events: mpsc::Sender<ScanEvent>,
    progress_tx: broadcast::Sender<ScanProgress>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    guard: BusyGuard,
}

impl Coordinator {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Message>,
        mut walk_task: JoinHandle<()>,
    ) {
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let mut walk_joined = false;

        let outcome = loop {
            if self.walk_finished && self.outstanding == 0 {
                break Outcome::Completed;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Outcome::Cancelled,
                _ = events.closed() => break Outcome::Abandoned,
                joined = &mut walk_task, if !walk_joined => {
                    walk_joined = true;
                    if let Err(err) = joined {
                        break Outcome::Failed(format!("walker stopped: {err}"));
                    }
                }
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        if self.handle(msg).await.is_err() {
                            break Outcome::Abandoned;
                        }
                    }
                    None => break Outcome::Failed("scan workers disconnected".to_string()),
                },
            }

            if let Some(progress) = self.tracker.poll(self.dirs_walked.load(Ordering::Relaxed)) {
                let _ = self.progress_tx.send(progress);
            }
        };

        self.finish(outcome).await;
    }

    async fn handle(&mut self, msg: Message) -> Result<(), ()> {
        let event = match msg {
            Message::Matched { index, path, name } => {
                debug_assert_eq!(index, self.records.len());
                self.records.push(MatchRecord::pending(path.clone(), name.clone()));
                self.outstanding += 1;
                self.tracker.record_match();
                ScanEvent::Matched { path, name }
            }
            Message::WalkError { path, error } => {
                self.walk_errors += 1;
                self.tracker.record_walk_error();
                ScanEvent::WalkError { path, error }
            }
            Message::SizeDone { index, outcome } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                let Some(record) = self.records.get_mut(index) else {
                    return Ok(());
                };
                match outcome {
                    Ok(report) => record.resolve(Some(report.bytes), report.size_error()),
                    Err(error) => record.resolve(None, Some(error)),
                }
                self.tracker.record_size(record.known_size());
                ScanEvent::SizeResolved {
                    path: record.path.clone(),
                    size_bytes: record.size_bytes,
                    size_error: record.size_error.clone(),
                }
            }
            Message::WalkFinished => {
                self.walk_finished = true;
                return Ok(());
            }
        };

        self.events.send(event).await.map_err(|_| ())
    }

    async fn finish(self, outcome: Outcome) {
        let Self {
            root,
            records,
            walk_errors,
            tracker,
            dirs_walked,
            events,
            progress_tx,
            cancel,
            shared,
            guard,
            ..
        } = self;

        // Late size results are discarded from here on.
        if !matches!(outcome, Outcome::Completed) {
            cancel.cancel();
        }

        let _ = progress_tx.send(tracker.snapshot(dirs_walked.load(Ordering::Relaxed)));
        let result = ScanResult::new(root.clone(), records, walk_errors, tracker.elapsed());

        let event = match outcome {
            Outcome::Completed => {
                shared.set_last_scan(Some(LastScan {
                    root,
                    registry: MatchRegistry::from_records(&result.matches),
                }));
                shared.set_state(ScanState::Completed);
                tracing::info!(
                    matches = result.summary.total_matches,
                    bytes = result.summary.total_bytes,
                    errors = result.summary.error_count(),
                    "scan completed"
                );
                Some(ScanEvent::Completed(result))
            }
            Outcome::Cancelled => {
                shared.set_state(ScanState::Cancelled);
                tracing::info!(matches = result.summary.total_matches, "scan cancelled");
                Some(ScanEvent::Cancelled(result))
            }
            Outcome::Failed(error) => {
                shared.set_state(ScanState::Failed);
                tracing::warn!(%error, "scan failed");
                Some(ScanEvent::Failed { error })
            }
            Outcome::Abandoned => {
                shared.set_state(ScanState::Cancelled);
                tracing::debug!("scan consumer dropped, abandoning scan");
                None
            }
        };

        // Callers may start the next operation as soon as they see the terminal event.
        drop(guard);

        if let Some(event) = event {
            let _ = events.send(event).await;
        }
    }
}
