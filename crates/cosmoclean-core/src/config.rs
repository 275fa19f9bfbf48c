//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::targets::{CaseSensitivity, TargetSet};

/// Folder names produced by common astrophotography preprocessing pipelines.
pub const DEFAULT_TARGETS: &[&str] = &[
    "calibrated",
    "debayered",
    "logs",
    "registered",
    "fastIntegration",
    "process",
];

/// How symbolic links found inside a matched folder contribute to its size.
///
/// Link targets are never traversed under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymlinkPolicy {
    /// Links contribute nothing.
    #[default]
    CountAsZero,
    /// Links contribute the size the platform reports for the link itself.
    CountOwnSize,
}

/// Configuration for a scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Folder names to search for.
    #[builder(default = "default_targets()")]
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,

    /// Name comparison policy.
    #[builder(default)]
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,

    /// Number of size workers (0 = hardware parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Symlink accounting inside matched folders.
    #[builder(default)]
    #[serde(default)]
    pub symlink_policy: SymlinkPolicy,
}

fn default_targets() -> Vec<String> {
    DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect()
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref targets) = self.targets {
            if targets.iter().all(|t| t.trim().is_empty()) {
                return Err("At least one target name is required".to_string());
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config for scanning a path with the default targets.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            targets: default_targets(),
            case_sensitivity: CaseSensitivity::default(),
            workers: 0,
            symlink_policy: SymlinkPolicy::default(),
        }
    }

    /// Replace the target names.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Worker count with `0` resolved to the available hardware parallelism.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// A validated, immutable scan request.
///
/// The root is checked against the filesystem by the scanner when the scan
/// starts; everything else is validated here.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Root path to walk.
    pub root: PathBuf,
    /// Names to match.
    pub targets: TargetSet,
    /// Size worker pool size, always positive.
    pub workers: usize,
    /// Symlink accounting inside matched folders.
    pub symlink_policy: SymlinkPolicy,
}

impl ScanRequest {
    /// Build a request from a target set with default worker and symlink settings.
    pub fn new(root: impl Into<PathBuf>, targets: TargetSet) -> Self {
        Self {
            root: root.into(),
            targets,
            workers: ScanConfig::default().effective_workers(),
            symlink_policy: SymlinkPolicy::default(),
        }
    }

    /// Validate a config into a request without touching the filesystem.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        if config.root.as_os_str().is_empty() {
            return Err(ScanError::invalid_root(&config.root, "path is empty"));
        }

        Ok(Self {
            root: config.root.clone(),
            targets: TargetSet::new(&config.targets, config.case_sensitivity)?,
            workers: config.effective_workers(),
            symlink_policy: config.symlink_policy,
        })
    }

    /// Set the worker pool size (clamped to at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the symlink policy.
    pub fn with_symlink_policy(mut self, policy: SymlinkPolicy) -> Self {
        self.symlink_policy = policy;
        self
    }
}
