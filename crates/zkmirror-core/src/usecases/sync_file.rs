//! File synchronization use case
//!
//! Mirrors one local file into the node named after it under a destination
//! prefix.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::newtypes::NodePath;
use crate::domain::{SyncError, SyncFailure};
use crate::ports::ILocalFileSystem;

use super::upsert_node::UpsertNodeUseCase;

/// Derives the node a local entry is mirrored to
///
/// The entry's base name is appended to `prefix`, so `/data/a.txt` under
/// `/app` maps to `/app/a.txt` and under `/` maps to `/a.txt`.
///
/// # Errors
///
/// Returns `SyncError::InvalidSource` if `source` has no UTF-8 base name and
/// `SyncError::InvalidDestination` if the base name is not a valid node name
pub fn destination_path(source: &Path, prefix: &NodePath) -> Result<NodePath, SyncError> {
    let name = source.file_name().ok_or_else(|| SyncError::InvalidSource {
        path: source.to_path_buf(),
        reason: "path has no base name".to_string(),
    })?;
    let name = name.to_str().ok_or_else(|| SyncError::InvalidSource {
        path: source.to_path_buf(),
        reason: "base name is not valid UTF-8".to_string(),
    })?;
    Ok(prefix.join(name)?)
}

/// Use case for synchronizing a single file
pub struct SyncFileUseCase {
    filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    upsert: Arc<UpsertNodeUseCase>,
}

impl SyncFileUseCase {
    /// Creates a new SyncFileUseCase
    ///
    /// # Arguments
    ///
    /// * `filesystem` - Local filesystem the source is read from
    /// * `upsert` - Upsert operation shared with the rest of the sync
    pub fn new(
        filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        upsert: Arc<UpsertNodeUseCase>,
    ) -> Self {
        Self { filesystem, upsert }
    }

    /// Writes the content of `source` to `prefix/<base name of source>`
    ///
    /// No remote call is made unless the whole file was read.
    ///
    /// # Errors
    ///
    /// Returns a `SyncFailure` tagged with the destination node, or with
    /// `prefix` when no destination could be derived
    #[instrument(skip(self), fields(source = %source.display(), prefix = %prefix))]
    pub async fn execute(&self, source: &Path, prefix: &NodePath) -> Result<NodePath, SyncFailure> {
        let destination =
            destination_path(source, prefix).map_err(|e| SyncFailure::new(prefix.clone(), e))?;
        let fail = |error: SyncError| SyncFailure::new(destination.clone(), error);

        let state = self
            .filesystem
            .get_state(source)
            .await
            .map_err(|e| fail(SyncError::local_io(source, e)))?;
        if !state.exists {
            return Err(fail(SyncError::local_io(
                source,
                anyhow::anyhow!("No such file or directory"),
            )));
        }
        if !state.is_regular_file() {
            return Err(fail(SyncError::NotARegularFile {
                path: source.to_path_buf(),
            }));
        }

        let data = self
            .filesystem
            .read_file(source)
            .await
            .map_err(|e| fail(SyncError::local_io(source, e)))?;
        debug!(%destination, bytes = data.len(), "read source file");

        self.upsert.execute(&destination, &data).await.map_err(fail)
    }
}
