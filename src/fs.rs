//! Filesystem access used by the request handlers.
//!
//! Provides a trait-based abstraction with implementations for:
//! - the local disk ([`LocalFileSystem`])
//! - an in-memory tree for deterministic tests ([`MemoryFileSystem`])

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Stream of file contents handed to the response body.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Result of a stat on an opened entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub is_dir: bool,
    /// Size in bytes; meaningless for directories.
    pub len: u64,
}

/// An immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl ChildEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// Open capability over some filesystem.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Open a file or directory. The handle is released when dropped.
    async fn open(&self, path: &Path) -> io::Result<Box<dyn OpenEntry>>;
}

/// An opened file or directory.
#[async_trait]
pub trait OpenEntry: Send + Sync {
    async fn stat(&self) -> io::Result<EntryMetadata>;

    /// Read every immediate child at once.
    async fn read_dir(&mut self) -> io::Result<Vec<ChildEntry>>;

    /// Consume the handle into a stream of its bytes.
    fn into_stream(self: Box<Self>) -> ByteStream;
}

/// Local disk access through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

struct LocalEntry {
    path: PathBuf,
    file: fs::File,
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn OpenEntry>> {
        let file = fs::File::open(path).await?;
        Ok(Box::new(LocalEntry {
            path: path.to_path_buf(),
            file,
        }))
    }
}

impl LocalEntry {
    /// Fail if `path` no longer names the entry behind the open handle.
    async fn ensure_unchanged(&self) -> io::Result<()> {
        let opened = self.file.metadata().await?;
        let current = fs::metadata(&self.path).await?;
        if same_entry(&opened, &current) {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} was replaced while listing",
                self.path.display()
            )))
        }
    }
}

#[cfg(unix)]
fn same_entry(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_entry(_: &std::fs::Metadata, _: &std::fs::Metadata) -> bool {
    true
}

#[async_trait]
impl OpenEntry for LocalEntry {
    async fn stat(&self) -> io::Result<EntryMetadata> {
        let meta = self.file.metadata().await?;
        Ok(EntryMetadata {
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }

    async fn read_dir(&mut self) -> io::Result<Vec<ChildEntry>> {
        // Listing goes by path, so it is bracketed by identity checks against
        // the open handle.
        self.ensure_unchanged().await?;
        let mut entries = fs::read_dir(&self.path).await?;
        let mut children = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("Skipping non-UTF-8 entry {:?} in {}", raw, self.path.display());
                    continue;
                }
            };
            // Follow symlinks; a dangling link is listed as itself.
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(_) => entry.metadata().await?,
            };
            children.push(if meta.is_dir() {
                ChildEntry::directory(name)
            } else {
                ChildEntry::file(name, meta.len())
            });
        }

        self.ensure_unchanged().await?;
        Ok(children)
    }

    fn into_stream(self: Box<Self>) -> ByteStream {
        ReaderStream::new(self.file).boxed()
    }
}

#[derive(Debug, Clone)]
enum MemoryNode {
    Dir,
    File(Bytes),
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    open: Option<io::ErrorKind>,
    stat: Option<io::ErrorKind>,
    read_dir: Option<io::ErrorKind>,
}

/// In-memory tree keyed by absolute path.
///
/// Failures can be injected per path and every `open` call is recorded, so
/// tests can assert that a rejected request never reached the filesystem.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, MemoryNode>,
    failures: HashMap<PathBuf, Failures>,
    opened: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and all of its ancestors.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_ancestors(&path);
        self.nodes.insert(path, MemoryNode::Dir);
        self
    }

    /// Add a file and all of its ancestors.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Bytes>) -> Self {
        let path = path.into();
        self.add_ancestors(&path);
        self.nodes.insert(path, MemoryNode::File(contents.into()));
        self
    }

    pub fn with_open_error(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.failures.entry(path.into()).or_default().open = Some(kind);
        self
    }

    pub fn with_stat_error(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.failures.entry(path.into()).or_default().stat = Some(kind);
        self
    }

    pub fn with_read_dir_error(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.failures.entry(path.into()).or_default().read_dir = Some(kind);
        self
    }

    /// Paths passed to `open`, in call order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(MemoryNode::Dir);
        }
    }

    fn children_of(&self, path: &Path) -> Vec<ChildEntry> {
        self.nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .filter_map(|(child, node)| {
                let name = child.file_name()?.to_string_lossy().to_string();
                Some(match node {
                    MemoryNode::Dir => ChildEntry::directory(name),
                    MemoryNode::File(data) => ChildEntry::file(name, data.len() as u64),
                })
            })
            .collect()
    }
}

struct MemoryEntry {
    node: MemoryNode,
    children: Vec<ChildEntry>,
    failures: Failures,
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn OpenEntry>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());

        let failures = self.failures.get(path).copied().unwrap_or_default();
        if let Some(kind) = failures.open {
            return Err(kind.into());
        }

        let Some(node) = self.nodes.get(path) else {
            let through_file = path
                .ancestors()
                .skip(1)
                .any(|ancestor| matches!(self.nodes.get(ancestor), Some(MemoryNode::File(_))));
            return Err(if through_file {
                io::ErrorKind::NotADirectory.into()
            } else {
                io::ErrorKind::NotFound.into()
            });
        };

        let children = match node {
            MemoryNode::Dir => self.children_of(path),
            MemoryNode::File(_) => Vec::new(),
        };

        Ok(Box::new(MemoryEntry {
            node: node.clone(),
            children,
            failures,
        }))
    }
}

#[async_trait]
impl OpenEntry for MemoryEntry {
    async fn stat(&self) -> io::Result<EntryMetadata> {
        if let Some(kind) = self.failures.stat {
            return Err(kind.into());
        }
        Ok(match &self.node {
            MemoryNode::Dir => EntryMetadata {
                is_dir: true,
                len: 0,
            },
            MemoryNode::File(data) => EntryMetadata {
                is_dir: false,
                len: data.len() as u64,
            },
        })
    }

    async fn read_dir(&mut self) -> io::Result<Vec<ChildEntry>> {
        if let Some(kind) = self.failures.read_dir {
            return Err(kind.into());
        }
        match self.node {
            MemoryNode::Dir => Ok(std::mem::take(&mut self.children)),
            MemoryNode::File(_) => Err(io::ErrorKind::NotADirectory.into()),
        }
    }

    fn into_stream(self: Box<Self>) -> ByteStream {
        match self.node {
            MemoryNode::File(data) => stream::once(async move { Ok::<_, io::Error>(data) }).boxed(),
            MemoryNode::Dir => stream::empty().boxed(),
        }
    }
}
