//! Single-threaded directory walk that discovers target folders.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::CompactString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cosmoclean_core::TargetSet;

use crate::aggregate::SizeReport;
use crate::fs::FileSystem;

/// Messages sent to the scan coordinator by the walker and size workers.
#[derive(Debug)]
pub(crate) enum Message {
    /// The walker found a target folder; `index` is its discovery position.
    Matched {
        index: usize,
        path: PathBuf,
        name: CompactString,
    },
    /// A directory, or one entry of it, could not be read.
    WalkError { path: PathBuf, error: String },
    /// A size job finished.
    SizeDone {
        index: usize,
        outcome: Result<SizeReport, String>,
    },
    /// The walker has no more directories to list.
    WalkFinished,
}

/// Depth-first walker.
///
/// Each directory is listed once, in pre-order, with entries in name order.
/// Matched folders are reported and handed to `submit` but never entered.
pub(crate) struct Walker {
    pub fs: Arc<dyn FileSystem>,
    pub targets: TargetSet,
    pub cancel: CancellationToken,
    pub tx: mpsc::UnboundedSender<Message>,
    pub dirs_walked: Arc<AtomicU64>,
}

impl Walker {
    pub fn run(self, root: PathBuf, mut submit: impl FnMut(usize, PathBuf)) {
        let mut stack = vec![root];
        let mut matched = 0usize;

        'walk: while let Some(dir) = stack.pop() {
            if self.cancel.is_cancelled() {
                break;
            }

            let listing = match self.fs.list_directory(&dir) {
                Ok(listing) => listing,
                Err(err) => {
                    tracing::warn!(path = %dir.display(), error = %err, "cannot list directory");
                    let _ = self.tx.send(Message::WalkError {
                        path: dir,
                        error: err.to_string(),
                    });
                    continue;
                }
            };
            self.dirs_walked.fetch_add(1, Ordering::Relaxed);

            for failure in listing.failures {
                tracing::warn!(
                    path = %failure.path.display(),
                    error = %failure.error,
                    "cannot read entry"
                );
                let _ = self.tx.send(Message::WalkError {
                    path: failure.path,
                    error: failure.error.to_string(),
                });
            }

            let mut subdirs = Vec::new();
            for entry in listing.entries {
                if entry.is_symlink || !entry.is_dir {
                    continue;
                }

                let path = dir.join(&entry.name);
                let name = entry.name.to_str();
                if name.is_some_and(|n| self.targets.matches(n)) {
                    if self.cancel.is_cancelled() {
                        break 'walk;
                    }
                    let name = CompactString::from(name.unwrap_or_default());
                    tracing::debug!(path = %path.display(), "matched target folder");
                    if self
                        .tx
                        .send(Message::Matched {
                            index: matched,
                            path: path.clone(),
                            name,
                        })
                        .is_err()
                    {
                        break 'walk;
                    }
                    submit(matched, path);
                    matched += 1;
                } else {
                    subdirs.push(path);
                }
            }

            stack.extend(subdirs.into_iter().rev());
        }

        let _ = self.tx.send(Message::WalkFinished);
    }
}
