//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the sync use cases consume to inspect and
//! read the local tree being mirrored.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific;
//!   the use cases wrap them into `SyncError::LocalIo` with the offending path.
//! - `list_entries` returns a fully materialized listing with each entry
//!   already classified, so a folder sync can register every child in one
//!   pass without awaiting in between.
//! - `canonicalize` gives directories a link-free identity, so a folder sync
//!   that follows links can recognize a directory it is already inside.

use std::path::{Path, PathBuf};

// ============================================================================
// EntryKind / FileSystemState
// ============================================================================

/// Classification of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file
    File,
    /// A directory
    Directory,
    /// A symbolic link that was not followed (or whose target is missing)
    Symlink,
    /// Sockets, FIFOs, device nodes and anything else
    Other,
}

impl EntryKind {
    /// Short lowercase label for logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Other => "other",
        }
    }
}

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether anything exists at the path
    pub exists: bool,
    /// What the path is (meaningless when `exists` is false)
    pub kind: EntryKind,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            kind: EntryKind::Other,
        }
    }

    /// Returns true if the path exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.kind == EntryKind::File
    }

    /// Returns true if the path exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && self.kind == EntryKind::Directory
    }
}

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// Classification at listing time
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - `get_state` returns `FileSystemState::not_found()` for a missing path
///   instead of an error.
/// - Symlink handling (follow or report as [`EntryKind::Symlink`]) is an
///   adapter policy and applies to both `get_state` and `list_entries`.
/// - Listing order is unspecified by contract.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read
    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

    /// Gets the current state of a path
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState>;

    /// Lists and classifies the immediate entries of a directory
    ///
    /// # Errors
    /// Returns an error if the directory cannot be opened or read
    async fn list_entries(&self, directory: &Path) -> anyhow::Result<Vec<DirEntry>>;

    /// Resolves `path` to its absolute form with every symlink expanded
    ///
    /// # Errors
    /// Returns an error if the path does not exist or cannot be resolved
    async fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf>;
}
