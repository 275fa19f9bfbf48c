//! Recursive size aggregation for matched folders.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use cosmoclean_core::{ScanError, SymlinkPolicy};

use crate::fs::{FileSystem, Listing};

/// Outcome of summing one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    /// Sum of all readable file sizes.
    pub bytes: u64,
    /// Number of files counted.
    pub files: u64,
    /// Number of entries skipped because they could not be read.
    pub skipped: u64,
    /// First error encountered, if any.
    pub first_error: Option<String>,
}

impl SizeReport {
    fn skip(&mut self, path: &Path, error: &std::io::Error) {
        tracing::debug!(path = %path.display(), %error, "skipping unreadable entry");
        self.skipped += 1;
        if self.first_error.is_none() {
            self.first_error = Some(format!("{}: {error}", path.display()));
        }
    }

    /// Whether some entries were left out of the sum.
    pub fn is_partial(&self) -> bool {
        self.skipped > 0
    }

    /// Error text to attach to the match record, if the sum is partial.
    pub fn size_error(&self) -> Option<String> {
        let first = self.first_error.as_ref()?;
        Some(match self.skipped {
            1 => format!("1 entry could not be read ({first})"),
            n => format!("{n} entries could not be read (first: {first})"),
        })
    }
}

/// Sums file sizes beneath a directory without following symbolic links.
pub struct SizeAggregator<'a> {
    fs: &'a dyn FileSystem,
    symlink_policy: SymlinkPolicy,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> SizeAggregator<'a> {
    pub fn new(fs: &'a dyn FileSystem, symlink_policy: SymlinkPolicy) -> Self {
        Self {
            fs,
            symlink_policy,
            cancel: None,
        }
    }

    /// Stop early once `token` is cancelled.
    pub fn with_cancel(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    /// Compute the recursive size of `path`.
    ///
    /// Unreadable entries below `path` are skipped and counted in the report.
    /// Fails only when `path` itself cannot be listed, or on cancellation.
    pub fn compute_size(&self, path: &Path) -> Result<SizeReport, ScanError> {
        let mut report = SizeReport::default();

        let listing = self
            .fs
            .list_directory(path)
            .map_err(|e| ScanError::io(path, e))?;
        let mut pending: Vec<PathBuf> = Vec::new();
        self.sum_entries(path, listing, &mut pending, &mut report);

        while let Some(dir) = pending.pop() {
            if self.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            match self.fs.list_directory(&dir) {
                Ok(listing) => self.sum_entries(&dir, listing, &mut pending, &mut report),
                Err(err) => report.skip(&dir, &err),
            }
        }

        Ok(report)
    }

    fn sum_entries(
        &self,
        dir: &Path,
        listing: Listing,
        pending: &mut Vec<PathBuf>,
        report: &mut SizeReport,
    ) {
        for failure in &listing.failures {
            report.skip(&failure.path, &failure.error);
        }

        for entry in listing.entries {
            let path = dir.join(&entry.name);

            if entry.is_symlink {
                if self.symlink_policy == SymlinkPolicy::CountOwnSize {
                    match self.fs.stat_file(&path) {
                        Ok(stat) => report.bytes += stat.size_bytes,
                        Err(err) => report.skip(&path, &err),
                    }
                }
            } else if entry.is_dir {
                pending.push(path);
            } else {
                match self.fs.stat_file(&path) {
                    Ok(stat) => {
                        report.bytes += stat.size_bytes;
                        report.files += 1;
                    }
                    Err(err) => report.skip(&path, &err),
                }
            }
        }
    }
}
