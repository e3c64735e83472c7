//! json-pages: JSON files on disk served as pages
//!
//! Pages live in a directory tree of `.json` files. A logical path such as
//! `docs/setup` maps to `<root>/docs/setup.json`; a path naming a directory
//! maps to its `index.json`. Files are parsed lazily and cached until their
//! modification time changes.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod server;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::{ContentStore, MissingResource, StoreError};
pub use config::PagesConfig;
pub use content::{Page, PageError};

/// The main application
#[derive(Clone)]
pub struct JsonPages {
    /// Page configuration, as loaded
    pub config: PagesConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content root directory
    pub root_dir: PathBuf,
    /// Shared page cache
    pub store: Arc<ContentStore>,
}

impl JsonPages {
    /// Create an instance from a site directory, reading `pages.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(config::CONFIG_FILE);

        let config = if config_path.exists() {
            PagesConfig::load(&config_path)?
        } else {
            PagesConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an explicit configuration
    pub fn with_config(base_dir: PathBuf, config: PagesConfig) -> Self {
        let root_dir = config.root_in(&base_dir);
        // Cache keys must match the absolute paths file watchers report
        let root_dir = root_dir.canonicalize().unwrap_or(root_dir);

        let store = ContentStore::new(&PagesConfig {
            root: root_dir.clone(),
            ..config.clone()
        });

        Self {
            config,
            base_dir,
            root_dir,
            store: Arc::new(store),
        }
    }

    /// Get a page by logical path
    pub fn page(&self, path: &str) -> Result<Arc<Page>, StoreError> {
        self.store.get(path)
    }

    /// Forget all cached pages
    pub fn reload(&self) {
        self.store.reload()
    }
}
