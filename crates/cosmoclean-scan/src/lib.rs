//! Target-folder scanning engine for cosmoclean.
//!
//! # Overview
//!
//! `cosmoclean-scan` walks a directory tree looking for folders with
//! configured names (e.g. `calibrated`, `registered`), measures each match
//! on a bounded worker pool and lets the caller delete selected matches.
//!
//! - **One walker thread** lists directories in a deterministic order
//! - **Bounded rayon pool** computes recursive folder sizes concurrently
//! - **Event stream** over tokio channels: matches, sizes, errors, completion
//! - **Cooperative cancellation** via a `CancellationToken`
//! - **Guarded deletion** limited to matches of the last completed scan
//!
//! # Example
//!
//! ```rust,no_run
//! use cosmoclean_scan::{ScanConfig, ScanEvent, ScanRequest, Scanner};
//!
//! # async fn run() -> Result<(), cosmoclean_scan::ScanError> {
//! let config = ScanConfig::new("/astro/M31");
//! let scanner = Scanner::new();
//! let mut handle = scanner.scan(ScanRequest::from_config(&config)?)?;
//!
//! while let Some(event) = handle.recv().await {
//!     match event {
//!         ScanEvent::Matched { path, .. } => println!("found {}", path.display()),
//!         ScanEvent::Completed(result) => {
//!             println!("{} bytes in {} folders", result.total_bytes(), result.len());
//!             let paths: Vec<_> = result.paths().map(|p| p.to_path_buf()).collect();
//!             let summary = scanner.delete_selected(paths)?.finish().await;
//!             println!("{summary:?}");
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use cosmoclean_scan::Scanner;
//!
//! let scanner = Scanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{} directories walked", progress.dirs_walked);
//!     }
//! });
//! ```

mod aggregate;
mod delete;
mod fs;
mod progress;
mod registry;
mod scanner;
mod walker;

pub use aggregate::{SizeAggregator, SizeReport};
pub use delete::DeletionHandle;
pub use fs::{DirEntry, EntryError, FileStat, FileSystem, Listing, LocalFileSystem};
pub use progress::ScanProgress;
pub use registry::MatchRegistry;
pub use scanner::{ScanHandle, Scanner};

// Re-export core types for convenience
pub use cosmoclean_core::{
    CaseSensitivity, DeletionEvent, DeletionSummary, MatchRecord, ScanConfig, ScanError,
    ScanEvent, ScanRequest, ScanResult, ScanState, ScanSummary, SymlinkPolicy, TargetSet,
};

/// Buffer size for scan events.
pub const SCAN_CHANNEL_SIZE: usize = 256;

/// Buffer size for deletion events.
pub const DELETE_CHANNEL_SIZE: usize = 100;

/// Buffer size for progress snapshots.
pub const PROGRESS_CHANNEL_SIZE: usize = 100;
