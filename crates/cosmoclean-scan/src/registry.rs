//! Registry of deletable matches from the last completed scan.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use cosmoclean_core::MatchRecord;

/// Tracks which paths a completed scan reported, with their recorded sizes.
///
/// Deletion requests are checked against this registry, and removed paths
/// are dropped from it so they cannot be deleted twice.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    known: DashMap<PathBuf, u64>,
}

impl MatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            known: DashMap::new(),
        }
    }

    /// Build a registry from scan records.
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let registry = Self::new();
        for record in records {
            registry.register(record.path.clone(), record.known_size());
        }
        registry
    }

    /// Register a path. Returns `true` if it was not already known.
    pub fn register(&self, path: PathBuf, size_bytes: u64) -> bool {
        self.known.insert(path, size_bytes).is_none()
    }

    /// Recorded size of a known path.
    pub fn size_of(&self, path: &Path) -> Option<u64> {
        self.known.get(path).map(|entry| *entry.value())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.known.contains_key(path)
    }

    /// Forget a path, returning its recorded size.
    pub fn remove(&self, path: &Path) -> Option<u64> {
        self.known.remove(path).map(|(_, size)| size)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
