//! Events delivered to the presentation layer.

use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::record::ScanResult;

/// An event produced by a running scan.
///
/// `Matched` events arrive in discovery order. `SizeResolved` events may
/// arrive in any order. Exactly one terminal event (`Completed`,
/// `Cancelled` or `Failed`) ends the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// A target folder was found; its size is still pending.
    Matched { path: PathBuf, name: CompactString },
    /// A directory, or one entry of it, could not be read during the walk.
    WalkError { path: PathBuf, error: String },
    /// The size of a previously matched folder is known.
    SizeResolved {
        path: PathBuf,
        size_bytes: Option<u64>,
        size_error: Option<String>,
    },
    /// The walk and all size jobs finished.
    Completed(ScanResult),
    /// The scan was cancelled; carries the matches discovered so far.
    Cancelled(ScanResult),
    /// The scan died unexpectedly.
    Failed { error: String },
}

impl ScanEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::Cancelled(_) | Self::Failed { .. }
        )
    }

    /// The final result carried by a terminal event, if any.
    pub fn into_result(self) -> Option<ScanResult> {
        match self {
            Self::Completed(result) | Self::Cancelled(result) => Some(result),
            _ => None,
        }
    }
}

/// An event produced while deleting selected matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeletionEvent {
    /// A folder was removed.
    Deleted { path: PathBuf, bytes: u64 },
    /// A folder could not be removed; the batch continues.
    DeleteFailed { path: PathBuf, error: String },
    /// All requested folders have been processed.
    Finished(DeletionSummary),
}

/// Result of a completed deletion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    /// Number of folders removed.
    pub deleted: usize,
    /// Number of folders that could not be removed.
    pub failed: usize,
    /// Bytes freed, from the sizes recorded by the scan.
    pub bytes_freed: u64,
    /// Failed paths with their error messages.
    pub failures: Vec<(PathBuf, String)>,
}

impl DeletionSummary {
    /// Check if every folder was removed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the batch.
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("Deleted {} folder(s)", self.deleted)
        } else {
            format!("Deleted {} folder(s), {} failed", self.deleted, self.failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_terminal_events() {
        let result = ScanResult::new(PathBuf::from("/r"), Vec::new(), 0, Duration::ZERO);

        assert!(ScanEvent::Completed(result.clone()).is_terminal());
        assert!(ScanEvent::Cancelled(result.clone()).is_terminal());
        assert!(ScanEvent::Failed { error: "x".into() }.is_terminal());
        assert!(
            !ScanEvent::Matched {
                path: "/r/logs".into(),
                name: "logs".into()
            }
            .is_terminal()
        );
        assert!(ScanEvent::Completed(result).into_result().is_some());
    }

    #[test]
    fn test_deletion_summary_text() {
        let ok = DeletionSummary {
            deleted: 2,
            ..Default::default()
        };
        assert!(ok.is_success());
        assert_eq!(ok.summary(), "Deleted 2 folder(s)");

        let partial = DeletionSummary {
            deleted: 1,
            failed: 1,
            bytes_freed: 10,
            failures: vec![(PathBuf::from("/r/logs"), "gone".into())],
        };
        assert!(!partial.is_success());
        assert_eq!(partial.summary(), "Deleted 1 folder(s), 1 failed");
    }
}
