//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **No implicit link following**: entries are classified from
//!   `symlink_metadata`, so a symlink is reported as [`EntryKind::Symlink`]
//!   unless the adapter was built with `follow_symlinks`.
//! - **Dangling links**: when following, a link whose target is missing is
//!   still reported as a symlink and left for the caller to skip.
//! - **Stable listings**: `list_entries` sorts by path so repeated runs
//!   launch children in the same order.

use std::fs::FileType;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};

use zkmirror_core::ports::{DirEntry, EntryKind, FileSystemState, ILocalFileSystem};

// ============================================================================
// LocalFileSystemAdapter struct
// ============================================================================

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter {
    follow_symlinks: bool,
}

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter` that does not follow symlinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify symlinks by their target instead of as links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Stats `path` under the adapter's link policy.
    ///
    /// Returns `None` if nothing exists at `path`.
    async fn classify(&self, path: &Path) -> std::io::Result<Option<EntryKind>> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if metadata.file_type().is_symlink() && self.follow_symlinks {
            return match tokio::fs::metadata(path).await {
                Ok(target) => Ok(Some(kind_of(&target.file_type()))),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    trace!(path = %path.display(), "dangling symlink");
                    Ok(Some(EntryKind::Symlink))
                }
                Err(e) => Err(e),
            };
        }

        Ok(Some(kind_of(&metadata.file_type())))
    }
}

fn kind_of(file_type: &FileType) -> EntryKind {
    if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Other
    }
}

// ============================================================================
// ILocalFileSystem implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        debug!("reading file");
        let data = tokio::fs::read(path).await?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        let Some(kind) = self.classify(path).await? else {
            debug!("path not found");
            return Ok(FileSystemState::not_found());
        };

        debug!(kind = kind.as_str(), "state retrieved");
        Ok(FileSystemState { exists: true, kind })
    }

    #[instrument(skip(self), fields(path = %directory.display()))]
    async fn list_entries(&self, directory: &Path) -> anyhow::Result<Vec<DirEntry>> {
        let mut reader = tokio::fs::read_dir(directory).await?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            let kind = if file_type.is_symlink() && self.follow_symlinks {
                match self.classify(&path).await? {
                    Some(kind) => kind,
                    None => {
                        trace!(path = %path.display(), "entry vanished while listing");
                        continue;
                    }
                }
            } else {
                kind_of(&file_type)
            };
            entries.push(DirEntry::new(path, kind));
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(count = entries.len(), "directory listed");
        Ok(entries)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let resolved = tokio::fs::canonicalize(path).await?;
        trace!(resolved = %resolved.display(), "path canonicalized");
        Ok(resolved)
    }
}

// ============================================================================
// Unit tests
// ============================================================================
