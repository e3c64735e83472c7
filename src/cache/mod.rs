//! Page cache
//!
//! [`ContentStore`] maps logical request paths onto files under a content
//! root, loads them on demand and keeps the resulting [`Page`]s keyed by file
//! path together with the file's modification time at load. A cached page is
//! reused only while that modification time is unchanged, so edits on disk
//! are picked up on the next lookup.
//!
//! Freshness is only as fine as the file system's mtime granularity: two
//! writes within the same tick look identical and the second may be missed
//! until the next change (or an explicit [`ContentStore::invalidate_file`]).
//!
//! Concurrent misses for the same file may each load it; the last insert
//! wins. The cache lock is never held across file I/O.

use lru::LruCache;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use thiserror::Error;

use crate::config::{DecodeError, Encoding, PagesConfig};
use crate::content::{FileSystem, LocalFileSystem, Page};

/// Errors returned by [`ContentStore`] lookups
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No page at `{path}` (looked for `{}`)", .file.display())]
    NotFound {
        path: String,
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error when reading `{}`", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot decode `{}`", .file.display())]
    Decode {
        file: PathBuf,
        #[source]
        source: DecodeError,
    },
}

impl StoreError {
    /// Whether this error means the page simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Host error types that have a "missing resource" case, such as an HTTP 404.
///
/// [`ContentStore::get_or_fail`] builds the missing case from a
/// [`StoreError::NotFound`] and converts every other error with `From`.
pub trait MissingResource: From<StoreError> {
    fn missing(path: &str, cause: StoreError) -> Self;
}

/// A cached page and the file modification time it was loaded at
struct CacheEntry {
    page: Arc<Page>,
    mtime: SystemTime,
}

/// File-backed, lazily loaded page cache
pub struct ContentStore {
    root: PathBuf,
    extension: String,
    encoding: Encoding,
    index_file: String,
    fs: Arc<dyn FileSystem>,
    /// Keyed by resolved file path
    entries: Mutex<LruCache<PathBuf, CacheEntry>>,
}

impl ContentStore {
    /// Create a store reading from the local disk.
    ///
    /// `config.root` is used as given; resolve it against the site
    /// directory first if it is relative.
    pub fn new(config: &PagesConfig) -> Self {
        Self::with_file_system(config, LocalFileSystem)
    }

    /// Create a store over an arbitrary [`FileSystem`]
    pub fn with_file_system(config: &PagesConfig, fs: impl FileSystem + 'static) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            encoding: config.encoding,
            index_file: config.index_file_name(),
            fs: Arc::new(fs),
            entries: Mutex::new(lru_for(config.max_entries)),
        }
    }

    /// Content root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical path onto the file that backs it.
    ///
    /// `root/<path>` naming a directory resolves to its index file, anything
    /// else gets the extension appended. A leading `/` is ignored; paths that
    /// would leave the root are reported as not found.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = path.trim_start_matches('/');
        let escapes = Path::new(relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::NotFound {
                path: path.to_string(),
                file: self.root.join(relative),
                source: io::Error::new(io::ErrorKind::NotFound, "path leaves the content root"),
            });
        }

        let joined = self.root.join(relative);
        if self.fs.is_dir(&joined) {
            return Ok(joined.join(&self.index_file));
        }

        let mut file = joined.into_os_string();
        file.push(&self.extension);
        Ok(PathBuf::from(file))
    }

    /// Get the page for `path`, loading it if it is not cached or its file
    /// changed since it was cached
    pub fn get(&self, path: &str) -> Result<Arc<Page>, StoreError> {
        let file = self.resolve(path)?;
        let mtime = self
            .fs
            .modified(&file)
            .map_err(|e| io_error(path, &file, e))?;

        if let Some(page) = self.lookup(&file, mtime) {
            tracing::trace!("Cache hit: {} ({})", path, file.display());
            return Ok(page);
        }

        tracing::debug!("Loading page: {} ({})", path, file.display());
        let bytes = self.fs.read(&file).map_err(|e| io_error(path, &file, e))?;
        let raw = self
            .encoding
            .decode(bytes)
            .map_err(|source| StoreError::Decode {
                file: file.clone(),
                source,
            })?;

        let page = Arc::new(Page::new(path, raw));
        self.insert(
            file,
            CacheEntry {
                page: Arc::clone(&page),
                mtime,
            },
        );
        Ok(page)
    }

    /// Like [`get`](Self::get), but a missing page is `Ok(None)`
    pub fn find(&self, path: &str) -> Result<Option<Arc<Page>>, StoreError> {
        match self.get(path) {
            Ok(page) => Ok(Some(page)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`get`](Self::get), but a missing page becomes the host's
    /// missing-resource error
    pub fn get_or_fail<E: MissingResource>(&self, path: &str) -> Result<Arc<Page>, E> {
        match self.get(path) {
            Ok(page) => Ok(page),
            Err(e) if e.is_not_found() => Err(E::missing(path, e)),
            Err(e) => Err(E::from(e)),
        }
    }

    /// Forget every cached page; each is reloaded on its next lookup
    pub fn reload(&self) {
        let mut entries = self.entries();
        tracing::debug!("Dropping {} cached pages", entries.len());
        entries.clear();
    }

    /// Forget the cached page for a logical path. Returns whether one was cached.
    pub fn invalidate(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(file) => self.invalidate_file(&file),
            Err(_) => false,
        }
    }

    /// Forget the cached page backed by `file`. Returns whether one was cached.
    pub fn invalidate_file(&self, file: &Path) -> bool {
        let removed = self.entries().pop(file).is_some();
        if removed {
            tracing::debug!("Invalidated {}", file.display());
        }
        removed
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical paths of every page file under the root, sorted.
    ///
    /// Index files are listed under their own name (`docs/index`). Nothing
    /// is loaded or cached.
    pub fn paths(&self) -> Result<Vec<String>, StoreError> {
        let files = self
            .fs
            .list_files(&self.root)
            .map_err(|source| StoreError::Io {
                file: self.root.clone(),
                source,
            })?;

        let mut paths: Vec<String> = files
            .iter()
            .filter_map(|file| self.logical_path(file))
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn logical_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?.to_str()?;
        let stem = relative.strip_suffix(self.extension.as_str())?;
        // A bare extension such as `docs/.json` names no page
        if stem.is_empty() || stem.ends_with(std::path::MAIN_SEPARATOR) {
            return None;
        }
        Some(stem.replace(std::path::MAIN_SEPARATOR, "/"))
    }

    fn lookup(&self, file: &Path, mtime: SystemTime) -> Option<Arc<Page>> {
        let mut entries = self.entries();
        let entry = entries.get(file)?;
        if entry.mtime != mtime {
            return None;
        }
        Some(Arc::clone(&entry.page))
    }

    fn insert(&self, file: PathBuf, entry: CacheEntry) {
        let mut entries = self.entries();
        // `push` hands back either the stale entry for this file or the evicted one
        if let Some((old, _)) = entries.push(file.clone(), entry) {
            if old != file {
                tracing::debug!("Evicted {}", old.display());
            }
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<PathBuf, CacheEntry>> {
        // Entries are replaced whole, so a poisoning panic cannot leave one half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Least-recently-used map, bounded when `max_entries` is set
fn lru_for(max_entries: Option<usize>) -> LruCache<PathBuf, CacheEntry> {
    match max_entries.and_then(NonZeroUsize::new) {
        Some(max) => LruCache::new(max),
        None => LruCache::unbounded(),
    }
}

fn io_error(path: &str, file: &Path, source: io::Error) -> StoreError {
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => StoreError::NotFound {
            path: path.to_string(),
            file: file.to_path_buf(),
            source,
        },
        _ => StoreError::Io {
            file: file.to_path_buf(),
            source,
        },
    }
}
