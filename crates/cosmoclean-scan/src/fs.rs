//! Filesystem primitives consumed by the scanner.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry basename.
    pub name: OsString,
    /// True for real directories; false for symlinks, even when they point at one.
    pub is_dir: bool,
    /// True for symbolic links.
    pub is_symlink: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            is_symlink: false,
        }
    }

    pub fn dir(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            is_symlink: false,
        }
    }

    pub fn symlink(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            is_symlink: true,
        }
    }
}

/// An entry that was listed but could not be examined.
#[derive(Debug)]
pub struct EntryError {
    /// Path of the entry, or of the directory when the name is unknown.
    pub path: PathBuf,
    pub error: io::Error,
}

/// Result of listing one directory.
///
/// Entries that fail individually (e.g. a file removed between `readdir`
/// and the type lookup) land in `failures`; the rest of the listing is kept.
#[derive(Debug, Default)]
pub struct Listing {
    /// Readable entries, sorted by name.
    pub entries: Vec<DirEntry>,
    pub failures: Vec<EntryError>,
}

impl Listing {
    pub fn new(entries: Vec<DirEntry>) -> Self {
        Self {
            entries,
            failures: Vec::new(),
        }
    }
}

/// Size information for a single file or link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size_bytes: u64,
}

/// The filesystem operations the scanner and deleter rely on.
///
/// Implementations must be usable from several threads at once: listing
/// runs on the traversal thread while `stat_file` and `list_directory` are
/// called concurrently from size workers.
pub trait FileSystem: Send + Sync + 'static {
    /// Canonicalize a scan root, failing unless it is a readable directory.
    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf>;

    /// List a directory. Entries are returned sorted by name.
    ///
    /// Fails only when the directory itself cannot be read.
    fn list_directory(&self, path: &Path) -> io::Result<Listing>;

    /// Stat a path without following symbolic links.
    fn stat_file(&self, path: &Path) -> io::Result<FileStat>;

    /// Remove a directory and everything beneath it.
    fn delete_recursive(&self, path: &Path) -> io::Result<()>;
}

impl<T: FileSystem> FileSystem for std::sync::Arc<T> {
    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).resolve_dir(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Listing> {
        (**self).list_directory(path)
    }

    fn stat_file(&self, path: &Path) -> io::Result<FileStat> {
        (**self).stat_file(path)
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<()> {
        (**self).delete_recursive(path)
    }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn resolve_dir(&self, path: &Path) -> io::Result<PathBuf> {
        let canonical = fs::canonicalize(path)?;
        if !fs::metadata(&canonical)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            ));
        }
        // Fails early on unreadable roots.
        fs::read_dir(&canonical)?;
        Ok(canonical)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Listing> {
        let mut listing = Listing::default();
        for entry in fs::read_dir(path)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    listing.failures.push(EntryError {
                        path: path.to_path_buf(),
                        error,
                    });
                    continue;
                }
            };
            // Falls back to an lstat on filesystems without d_type.
            match entry.file_type() {
                Ok(file_type) => listing.entries.push(DirEntry {
                    name: entry.file_name(),
                    is_dir: file_type.is_dir(),
                    is_symlink: file_type.is_symlink(),
                }),
                Err(error) => listing.failures.push(EntryError {
                    path: entry.path(),
                    error,
                }),
            }
        }
        listing.entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn stat_file(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(FileStat {
            size_bytes: metadata.len(),
        })
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}
