//! Folder synchronization use case
//!
//! Mirrors a directory tree: the directory becomes an empty marker node and
//! every regular file and subdirectory below it is synced concurrently, each
//! as its own task. Failures of the whole subtree are collected by a
//! [`PendingGroup`] and reported once.
//!
//! Each nested sync knows the canonical paths of the folders above it, so a
//! followed link back into one of them is skipped instead of recursed into.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn, Instrument};

use crate::domain::newtypes::NodePath;
use crate::domain::{SyncError, SyncFailures};
use crate::ports::{EntryKind, ILocalFileSystem};

use super::pending_group::PendingGroup;
use super::sync_file::{destination_path, SyncFileUseCase};
use super::upsert_node::UpsertNodeUseCase;

/// Boxed future of a folder sync, spawnable on the runtime
pub type FolderSync = Pin<Box<dyn Future<Output = Result<NodePath, SyncFailures>> + Send + 'static>>;

/// Canonical directories from the top-level folder down to the current one
struct Ancestry {
    directory: PathBuf,
    parent: Option<Arc<Ancestry>>,
}

impl Ancestry {
    fn contains(&self, directory: &Path) -> bool {
        let mut cursor = Some(self);
        while let Some(ancestor) = cursor {
            if ancestor.directory == directory {
                return true;
            }
            cursor = ancestor.parent.as_deref();
        }
        false
    }
}

/// Use case for recursively synchronizing a directory
pub struct SyncFolderUseCase {
    filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    upsert: Arc<UpsertNodeUseCase>,
    files: Arc<SyncFileUseCase>,
}

impl SyncFolderUseCase {
    /// Creates a new SyncFolderUseCase
    ///
    /// Files below the folder are written through the same `upsert`, so a
    /// write limit configured on it applies to the whole tree.
    pub fn new(
        filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        upsert: Arc<UpsertNodeUseCase>,
    ) -> Self {
        let files = Arc::new(SyncFileUseCase::new(
            Arc::clone(&filesystem),
            Arc::clone(&upsert),
        ));
        Self {
            filesystem,
            upsert,
            files,
        }
    }

    /// Mirrors `source` to `prefix/<base name of source>`
    ///
    /// This method:
    /// 1. Writes the folder's marker node with an empty payload
    /// 2. Lists the folder's entries
    /// 3. Registers and spawns one child sync per file and subdirectory
    /// 4. Resolves once every child has reported
    ///
    /// Nothing is listed if the marker could not be written. A failing child
    /// never stops its siblings. A subdirectory that resolves to one of its
    /// own ancestors is skipped without writing anything.
    ///
    /// # Returns
    ///
    /// The folder's marker path, or every failed path of the subtree
    pub fn execute(self: &Arc<Self>, source: PathBuf, prefix: NodePath) -> FolderSync {
        self.descend(source, prefix, None)
    }

    fn descend(
        self: &Arc<Self>,
        source: PathBuf,
        prefix: NodePath,
        ancestry: Option<Arc<Ancestry>>,
    ) -> FolderSync {
        let this = Arc::clone(self);
        Box::pin(async move { this.run(source, prefix, ancestry).await })
    }

    #[instrument(skip(self, ancestry), fields(source = %source.display(), prefix = %prefix))]
    async fn run(
        self: Arc<Self>,
        source: PathBuf,
        prefix: NodePath,
        ancestry: Option<Arc<Ancestry>>,
    ) -> Result<NodePath, SyncFailures> {
        let destination = destination_path(&source, &prefix)
            .map_err(|e| SyncFailures::single(prefix.clone(), e))?;
        let fail = |error: SyncError| SyncFailures::single(destination.clone(), error);

        let state = self
            .filesystem
            .get_state(&source)
            .await
            .map_err(|e| fail(SyncError::local_io(&source, e)))?;
        if !state.exists {
            return Err(fail(SyncError::local_io(
                &source,
                anyhow::anyhow!("No such file or directory"),
            )));
        }
        if !state.is_directory() {
            return Err(fail(SyncError::NotADirectory { path: source }));
        }

        let canonical = self
            .filesystem
            .canonicalize(&source)
            .await
            .map_err(|e| fail(SyncError::local_io(&source, e)))?;
        if ancestry.as_deref().is_some_and(|a| a.contains(&canonical)) {
            warn!(
                path = %source.display(),
                target = %canonical.display(),
                "skipping directory that links back to an enclosing folder"
            );
            return Ok(destination);
        }
        let ancestry = Arc::new(Ancestry {
            directory: canonical,
            parent: ancestry,
        });

        trace!(%destination, "writing folder marker");
        self.upsert.execute(&destination, &[]).await.map_err(fail)?;

        let entries = self
            .filesystem
            .list_entries(&source)
            .await
            .map_err(|e| fail(SyncError::local_io(&source, e)))?;
        debug!(%destination, entries = entries.len(), "folder listed");

        let (group, outcome) = PendingGroup::new(destination.clone());

        // Every child is registered before it is spawned and nothing in this
        // loop awaits, so the group cannot resolve before the loop ends.
        for entry in entries {
            match entry.kind {
                EntryKind::File => {
                    let registration = group.register(self.child_path(&entry.path, &destination));
                    let files = Arc::clone(&self.files);
                    let prefix = destination.clone();
                    tokio::spawn(
                        async move {
                            let result = files.execute(&entry.path, &prefix).await;
                            registration.complete(result.map(drop).map_err(SyncFailures::from));
                        }
                        .in_current_span(),
                    );
                }
                EntryKind::Directory => {
                    let registration = group.register(self.child_path(&entry.path, &destination));
                    let nested =
                        self.descend(entry.path, destination.clone(), Some(Arc::clone(&ancestry)));
                    tokio::spawn(
                        async move {
                            registration.complete(nested.await.map(drop));
                        }
                        .in_current_span(),
                    );
                }
                EntryKind::Symlink | EntryKind::Other => {
                    warn!(
                        path = %entry.path.display(),
                        kind = entry.kind.as_str(),
                        "skipping entry that is neither a regular file nor a directory"
                    );
                }
            }
        }

        group.complete(&destination, None);
        drop(group);

        outcome.wait().await
    }

    /// Registration key of a child; the child reports the exact error itself
    /// if its node name is invalid.
    fn child_path(&self, source: &Path, folder: &NodePath) -> NodePath {
        destination_path(source, folder).unwrap_or_else(|_| folder.clone())
    }
}
