//! Error types for scan and deletion operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a scan or deletion request, or describe a localized
/// filesystem failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root is missing, unreadable or not a directory.
    #[error("Invalid root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Another scan or deletion is running on the same scanner.
    #[error("Scanner is busy with another operation")]
    Busy,

    /// Deletion was requested before any scan completed.
    #[error("No completed scan to delete from")]
    NoCompletedScan,

    /// A deletion target lies outside the last scan root.
    #[error("Path is outside the scanned root: {path}")]
    OutsideRoot { path: PathBuf },

    /// A deletion target is not a match from the last completed scan.
    #[error("Path is not a match from the last scan: {path}")]
    UnknownMatch { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Scans and deletions were started outside a Tokio runtime.
    #[error("A Tokio runtime is required to start scans and deletions")]
    NoRuntime,

    /// The size worker pool could not be created.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid root error.
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error rejected the request before any work started.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoot { .. }
                | Self::InvalidConfig { .. }
                | Self::Busy
                | Self::NoCompletedScan
                | Self::OutsideRoot { .. }
                | Self::UnknownMatch { .. }
                | Self::NoRuntime
                | Self::WorkerPool { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));

        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScanError::NotFound { .. }));

        let err = ScanError::io("/test/path", std::io::Error::other("boom"));
        assert!(matches!(err, ScanError::Io { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_rejections() {
        assert!(ScanError::Busy.is_rejection());
        assert!(ScanError::NoRuntime.is_rejection());
        assert!(ScanError::invalid_root("/x", "not a directory").is_rejection());
        assert!(!ScanError::Cancelled.is_rejection());
        assert!(!ScanError::NotFound { path: "/x".into() }.is_rejection());
    }
}
