//! Shared helpers for scanner integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use cosmoclean_scan::{DirEntry, EntryError, FileStat, FileSystem, Listing, ScanEvent, ScanHandle};

pub const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(u64),
    Symlink(u64),
}

/// A latch that blocks callers until opened.
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

/// In-memory filesystem with failure injection.
#[derive(Debug, Default)]
pub struct MemFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    deny_list: HashSet<PathBuf>,
    deny_stat: HashSet<PathBuf>,
    deny_entry: HashSet<PathBuf>,
    panic_list: HashSet<PathBuf>,
    gates: HashMap<PathBuf, Arc<Gate>>,
    list_calls: Mutex<HashMap<PathBuf, usize>>,
    deletions: Mutex<Vec<PathBuf>>,
}

impl MemFs {
    pub fn new(root: &str) -> Self {
        let fs = Self::default();
        fs.insert(root, Node::Dir);
        fs
    }

    fn insert(&self, path: &str, node: Node) {
        let path = PathBuf::from(path);
        let mut nodes = self.nodes.lock().unwrap();
        let mut parent = path.parent();
        while let Some(p) = parent {
            if p.as_os_str().is_empty() {
                break;
            }
            nodes.entry(p.to_path_buf()).or_insert(Node::Dir);
            parent = p.parent();
        }
        nodes.insert(path, node);
    }

    pub fn dir(self, path: &str) -> Self {
        self.insert(path, Node::Dir);
        self
    }

    pub fn file(self, path: &str, size: u64) -> Self {
        self.insert(path, Node::File(size));
        self
    }

    pub fn symlink(self, path: &str, own_size: u64) -> Self {
        self.insert(path, Node::Symlink(own_size));
        self
    }

    /// Make listing `path` fail with permission denied.
    pub fn deny_list(mut self, path: &str) -> Self {
        self.deny_list.insert(PathBuf::from(path));
        self
    }

    /// Make stat of `path` fail with permission denied.
    pub fn deny_stat(mut self, path: &str) -> Self {
        self.deny_stat.insert(PathBuf::from(path));
        self
    }

    /// Report `path` as unreadable in its parent's listing.
    pub fn deny_entry(mut self, path: &str) -> Self {
        self.deny_entry.insert(PathBuf::from(path));
        self
    }

    /// Panic when `path` is listed.
    pub fn panic_list(mut self, path: &str) -> Self {
        self.panic_list.insert(PathBuf::from(path));
        self
    }

    /// Block stat of `path` until the gate opens.
    pub fn gate_stat(mut self, path: &str, gate: Arc<Gate>) -> Self {
        self.gates.insert(PathBuf::from(path), gate);
        self
    }

    /// Remove a subtree behind the scanner's back.
    pub fn remove_external(&self, path: &str) {
        let path = Path::new(path);
        self.nodes
            .lock()
            .unwrap()
            .retain(|p, _| !p.starts_with(path));
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.lock().unwrap().contains_key(Path::new(path))
    }

    pub fn list_count(&self, path: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .get(Path::new(path))
            .copied()
            .unwrap_or(0)
    }

    pub fn deletions(&self) -> Vec<PathBuf> {
        self.deletions.lock().unwrap().clone()
    }
}

fn denied() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "permission denied")
}

fn not_found() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "no such file or directory")
}

impl FileSystem for MemFs {
    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::Dir) => Ok(path.to_path_buf()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )),
            None => Err(not_found()),
        }
    }

    fn list_directory(&self, path: &Path) -> io::Result<Listing> {
        *self
            .list_calls
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;

        if self.panic_list.contains(path) {
            panic!("listing {} blew up", path.display());
        }
        if self.deny_list.contains(path) {
            return Err(denied());
        }

        let nodes = self.nodes.lock().unwrap();
        if !matches!(nodes.get(path), Some(Node::Dir)) {
            return Err(not_found());
        }

        let mut listing = Listing::default();
        for (p, node) in nodes.iter().filter(|(p, _)| p.parent() == Some(path)) {
            if self.deny_entry.contains(p) {
                listing.failures.push(EntryError {
                    path: p.clone(),
                    error: not_found(),
                });
                continue;
            }
            let name = p.file_name().unwrap_or_default().to_os_string();
            listing.entries.push(match node {
                Node::Dir => DirEntry::dir(name),
                Node::File(_) => DirEntry::file(name),
                Node::Symlink(_) => DirEntry::symlink(name),
            });
        }
        Ok(listing)
    }

    fn stat_file(&self, path: &Path) -> io::Result<FileStat> {
        if let Some(gate) = self.gates.get(path) {
            gate.wait();
        }
        if self.deny_stat.contains(path) {
            return Err(denied());
        }
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File(size)) | Some(Node::Symlink(size)) => {
                Ok(FileStat { size_bytes: *size })
            }
            Some(Node::Dir) => Ok(FileStat { size_bytes: 0 }),
            None => Err(not_found()),
        }
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<()> {
        self.deletions.lock().unwrap().push(path.to_path_buf());
        let mut nodes = self.nodes.lock().unwrap();
        if !nodes.contains_key(path) {
            return Err(not_found());
        }
        nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

/// Collect every event until the stream ends.
pub async fn collect_events(mut handle: ScanHandle) -> Vec<ScanEvent> {
    tokio::time::timeout(TIMEOUT, async move {
        let mut events = Vec::new();
        while let Some(event) = handle.recv().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("scan did not finish in time")
}

/// Paths of `Matched` events, in arrival order.
pub fn matched_paths(events: &[ScanEvent]) -> Vec<PathBuf> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Matched { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect()
}
