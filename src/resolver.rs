//! Mapping of request paths onto the served directory tree.
//!
//! Resolution is purely lexical: request paths are normalized as if rooted at
//! `/`, joined onto the served root and checked component-by-component. The
//! filesystem is never touched here, so a rejected path is never opened.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::error::{ConfigError, ServeError};

/// The directory tree the server is allowed to expose.
///
/// Established once at startup and shared read-only between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedRoot {
    path: Arc<Path>,
}

/// A request path that has been proven to stay inside the served root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    request_path: String,
    fs_path: PathBuf,
}

impl ResolvedPath {
    /// Normalized request path, always starting with `/` (e.g. `/docs/a.txt`).
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// Absolute filesystem path below the served root.
    pub fn as_path(&self) -> &Path {
        &self.fs_path
    }

    pub fn is_root(&self) -> bool {
        self.request_path == "/"
    }
}

impl ServedRoot {
    /// Wrap an absolute directory path. Existence is checked by
    /// [`crate::config::Config::served_root`], not here.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ConfigError::RelativeRoot(path));
        }
        Ok(Self {
            path: Arc::from(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Component-aware containment: `/data-evil` is not inside `/data`.
    pub fn contains(&self, candidate: &Path) -> bool {
        match candidate.strip_prefix(&self.path) {
            Ok(rest) => rest
                .components()
                .all(|component| matches!(component, Component::Normal(_))),
            Err(_) => false,
        }
    }

    /// Resolve a decoded request path against the root.
    ///
    /// Fails with [`ServeError::PathEscape`] when `..` segments climb above the
    /// root or a segment smuggles in a non-normal path component.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath, ServeError> {
        let Some(segments) = normalize_segments(request_path) else {
            return Err(reject(request_path));
        };

        let mut fs_path = self.path.to_path_buf();
        for segment in &segments {
            if segment.contains('\0') {
                return Err(reject(request_path));
            }
            // A segment may still hold platform separators (e.g. `\` on Windows).
            for component in Path::new(segment).components() {
                match component {
                    Component::Normal(name) => fs_path.push(name),
                    _ => return Err(reject(request_path)),
                }
            }
        }

        if !self.contains(&fs_path) {
            return Err(reject(request_path));
        }

        Ok(ResolvedPath {
            request_path: format!("/{}", segments.join("/")),
            fs_path,
        })
    }
}

/// Collapse empty, `.` and `..` segments as if the path were rooted at `/`.
///
/// Returns `None` when a `..` would climb above the root.
fn normalize_segments(request_path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name => segments.push(name),
        }
    }
    Some(segments)
}

fn reject(request_path: &str) -> ServeError {
    warn!(path = %request_path, "Attempted to access unauthorized path");
    ServeError::PathEscape(request_path.to_string())
}
