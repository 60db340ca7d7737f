//! Read-only HTTP view over a single directory tree.
//!
//! Directories are rendered as HTML listings (directories first, then files,
//! each sorted by name) and files are streamed as-is. Every request path is
//! resolved against the served root with a component-aware containment check
//! before anything on disk is touched.

pub mod access_log;
pub mod config;
pub mod error;
pub mod fs;
pub mod handlers;
pub mod listing;
pub mod render;
pub mod resolver;
pub mod routes;

use std::sync::Arc;

pub use config::Config;
pub use error::{ConfigError, ServeError};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use resolver::{ResolvedPath, ServedRoot};
pub use routes::create_router;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Directory tree being served
    pub root: ServedRoot,
    /// Filesystem the root lives on
    pub fs: Arc<dyn FileSystem>,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Serve `root` from the local disk with default config.
    pub fn new(root: ServedRoot) -> Self {
        Self::with_config(root, Config::default())
    }

    /// Serve `root` from the local disk with the given config.
    pub fn with_config(root: ServedRoot, config: Config) -> Self {
        Self {
            root,
            fs: Arc::new(LocalFileSystem),
            config: Arc::new(config),
        }
    }

    /// Swap the filesystem, e.g. for an in-memory tree.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }
}
