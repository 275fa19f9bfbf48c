//! Guarded deletion of matched folders.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use cosmoclean_core::{DeletionEvent, DeletionSummary, ScanError};

use crate::DELETE_CHANNEL_SIZE;
use crate::fs::FileSystem;
use crate::scanner::{BusyGuard, Shared};

/// Stream of events from a running deletion batch.
#[derive(Debug)]
pub struct DeletionHandle {
    rx: mpsc::Receiver<DeletionEvent>,
}

impl DeletionHandle {
    /// Receive the next event, or `None` after `Finished`.
    pub async fn recv(&mut self) -> Option<DeletionEvent> {
        self.rx.recv().await
    }

    /// Drain events and return the batch summary.
    pub async fn finish(mut self) -> Option<DeletionSummary> {
        while let Some(event) = self.rx.recv().await {
            if let DeletionEvent::Finished(summary) = event {
                return Some(summary);
            }
        }
        None
    }

    /// Convert into a [`tokio_stream::Stream`] of events.
    pub fn into_stream(self) -> ReceiverStream<DeletionEvent> {
        ReceiverStream::new(self.rx)
    }
}

/// Validate a selection against the last completed scan and start deleting.
pub(crate) fn start_deletion<I, P>(
    fs: &Arc<dyn FileSystem>,
    shared: &Arc<Shared>,
    paths: I,
) -> Result<DeletionHandle, ScanError>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let runtime = Handle::try_current().map_err(|_| ScanError::NoRuntime)?;
    let guard = BusyGuard::acquire(shared)?;
    let last = shared.last_scan().ok_or(ScanError::NoCompletedScan)?;

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for path in paths {
        let path = path.into();
        if !seen.insert(path.clone()) {
            continue;
        }
        if path == last.root || !path.starts_with(&last.root) {
            return Err(ScanError::OutsideRoot { path });
        }
        let Some(size) = last.registry.size_of(&path) else {
            return Err(ScanError::UnknownMatch { path });
        };
        items.push((path, size));
    }

    let (tx, rx) = mpsc::channel(DELETE_CHANNEL_SIZE);
    let fs = Arc::clone(fs);

    runtime.spawn(async move {
        let mut summary = DeletionSummary::default();

        for (path, size) in items {
            let fs = Arc::clone(&fs);
            let target = path.clone();
            let result = tokio::task::spawn_blocking(move || fs.delete_recursive(&target))
                .await
                .map_err(|e| e.to_string())
                .and_then(|r| r.map_err(|e| e.to_string()));

            let event = match result {
                Ok(()) => {
                    last.registry.remove(&path);
                    summary.deleted += 1;
                    summary.bytes_freed += size;
                    tracing::debug!(path = %path.display(), bytes = size, "deleted folder");
                    DeletionEvent::Deleted { path, bytes: size }
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to delete folder");
                    summary.failed += 1;
                    summary.failures.push((path.clone(), error.clone()));
                    DeletionEvent::DeleteFailed { path, error }
                }
            };
            let _ = tx.send(event).await;
        }

        tracing::info!(
            deleted = summary.deleted,
            failed = summary.failed,
            bytes_freed = summary.bytes_freed,
            "deletion finished"
        );
        drop(guard);
        let _ = tx.send(DeletionEvent::Finished(summary)).await;
    });

    Ok(DeletionHandle { rx })
}
