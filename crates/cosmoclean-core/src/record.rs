//! Match records and scan results.

use std::path::{Path, PathBuf};
use std::time::Duration;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A directory whose basename matched one of the targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Absolute path of the matched directory.
    pub path: PathBuf,
    /// Basename as found on disk.
    pub name: CompactString,
    /// Recursive size in bytes, `None` while pending or when it could not be computed.
    pub size_bytes: Option<u64>,
    /// Description of size computation problems, if any.
    pub size_error: Option<String>,
}

impl MatchRecord {
    /// Create a record whose size has not been computed yet.
    pub fn pending(path: impl Into<PathBuf>, name: impl Into<CompactString>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size_bytes: None,
            size_error: None,
        }
    }

    /// Fill in the outcome of the size computation.
    pub fn resolve(&mut self, size_bytes: Option<u64>, size_error: Option<String>) {
        self.size_bytes = size_bytes;
        self.size_error = size_error;
    }

    /// Whether the size computation has reported back.
    pub fn is_resolved(&self) -> bool {
        self.size_bytes.is_some() || self.size_error.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.size_error.is_some()
    }

    /// Known size, or zero.
    pub fn known_size(&self) -> u64 {
        self.size_bytes.unwrap_or(0)
    }
}

/// Summary counters for a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of matched directories.
    pub total_matches: usize,
    /// Sum of all known sizes.
    pub total_bytes: u64,
    /// Number of matches whose size computation reported an error.
    pub total_errors: usize,
    /// Number of directories or entries that could not be read during the walk.
    pub walk_errors: usize,
}

impl ScanSummary {
    /// Compute the summary for a set of records.
    pub fn from_records(records: &[MatchRecord], walk_errors: usize) -> Self {
        Self {
            total_matches: records.len(),
            total_bytes: records.iter().map(MatchRecord::known_size).sum(),
            total_errors: records.iter().filter(|r| r.has_error()).count(),
            walk_errors,
        }
    }

    /// Total number of errors of either kind.
    pub fn error_count(&self) -> usize {
        self.total_errors + self.walk_errors
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Outcome of a scan: matches in discovery order plus summary counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Canonical root that was walked.
    pub root: PathBuf,
    /// Matches in discovery order.
    pub matches: Vec<MatchRecord>,
    /// Summary counters.
    pub summary: ScanSummary,
    /// Wall-clock duration of the scan.
    pub duration: Duration,
}

impl ScanResult {
    /// Create a result, computing its summary.
    pub fn new(
        root: PathBuf,
        matches: Vec<MatchRecord>,
        walk_errors: usize,
        duration: Duration,
    ) -> Self {
        let summary = ScanSummary::from_records(&matches, walk_errors);
        Self {
            root,
            matches,
            summary,
            duration,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.summary.total_bytes
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Look up a match by path.
    pub fn find(&self, path: &Path) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.path == path)
    }

    /// Iterate matched paths in discovery order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.matches.iter().map(|m| m.path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lifecycle() {
        let mut record = MatchRecord::pending("/data/A/calibrated", "calibrated");
        assert!(!record.is_resolved());
        assert_eq!(record.known_size(), 0);

        record.resolve(Some(150), None);
        assert!(record.is_resolved());
        assert!(!record.has_error());
        assert_eq!(record.known_size(), 150);
    }

    #[test]
    fn test_failed_record_is_resolved() {
        let mut record = MatchRecord::pending("/data/logs", "logs");
        record.resolve(None, Some("Path not found".into()));
        assert!(record.is_resolved());
        assert!(record.has_error());
    }

    #[test]
    fn test_summary_counts() {
        let mut a = MatchRecord::pending("/r/a/calibrated", "calibrated");
        a.resolve(Some(100), None);
        let mut b = MatchRecord::pending("/r/b/calibrated", "calibrated");
        b.resolve(Some(40), Some("1 entry skipped".into()));
        let mut c = MatchRecord::pending("/r/c/logs", "logs");
        c.resolve(None, Some("gone".into()));

        let summary = ScanSummary::from_records(&[a, b, c], 2);
        assert_eq!(summary.total_matches, 3);
        assert_eq!(summary.total_bytes, 140);
        assert_eq!(summary.total_errors, 2);
        assert_eq!(summary.walk_errors, 2);
        assert_eq!(summary.error_count(), 4);
        assert!(summary.has_errors());
    }

    #[test]
    fn test_result_lookup() {
        let result = ScanResult::new(
            PathBuf::from("/r"),
            vec![MatchRecord::pending("/r/x/logs", "logs")],
            0,
            Duration::ZERO,
        );

        assert_eq!(result.len(), 1);
        assert!(result.find(Path::new("/r/x/logs")).is_some());
        assert!(result.find(Path::new("/r/y/logs")).is_none());
        assert!(!result.summary.has_errors());
    }
}
