//! Scan progress reporting.

use std::time::{Duration, Instant};

/// Progress snapshot published while a scan runs.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Directories listed by the walker so far.
    pub dirs_walked: u64,
    /// Target folders found so far.
    pub matches_found: u64,
    /// Size jobs that have reported back.
    pub sizes_resolved: u64,
    /// Sum of resolved sizes.
    pub bytes_resolved: u64,
    /// Directories or entries that could not be read.
    pub walk_errors: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Size jobs still running or queued.
    pub fn sizes_pending(&self) -> u64 {
        self.matches_found.saturating_sub(self.sizes_resolved)
    }

    /// Directories listed per second.
    pub fn dirs_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.dirs_walked as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Coordinator-side tracker that rate-limits snapshots.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    last_publish: Option<Instant>,
    interval: Duration,
    matches_found: u64,
    sizes_resolved: u64,
    bytes_resolved: u64,
    walk_errors: u64,
}

impl ProgressTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            last_publish: None,
            interval,
            matches_found: 0,
            sizes_resolved: 0,
            bytes_resolved: 0,
            walk_errors: 0,
        }
    }

    pub fn record_match(&mut self) {
        self.matches_found += 1;
    }

    pub fn record_size(&mut self, bytes: u64) {
        self.sizes_resolved += 1;
        self.bytes_resolved += bytes;
    }

    pub fn record_walk_error(&mut self) {
        self.walk_errors += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Return a snapshot if the publish interval has passed.
    pub fn poll(&mut self, dirs_walked: u64) -> Option<ScanProgress> {
        let now = Instant::now();
        if self
            .last_publish
            .is_some_and(|last| now.duration_since(last) < self.interval)
        {
            return None;
        }
        self.last_publish = Some(now);
        Some(self.snapshot(dirs_walked))
    }

    pub fn snapshot(&self, dirs_walked: u64) -> ScanProgress {
        ScanProgress {
            dirs_walked,
            matches_found: self.matches_found,
            sizes_resolved: self.sizes_resolved,
            bytes_resolved: self.bytes_resolved,
            walk_errors: self.walk_errors,
            elapsed: self.start_time.elapsed(),
        }
    }
}
