//! File-system access used by the content store

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// What the content store needs from a file system.
///
/// Implementations must be shareable across request threads.
pub trait FileSystem: Send + Sync {
    /// Whether `path` names an existing directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Last modification time of the file at `path`
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Read the whole file at `path`
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Every regular file below `root`, recursively
    fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        // The handle is dropped before returning, including on read errors
        fs::read(path)
    }

    fn list_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
