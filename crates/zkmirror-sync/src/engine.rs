//! Mirror engine
//!
//! The [`MirrorEngine`] wires the sync use cases to a coordination store and
//! a local filesystem, and is the entry point for mirroring one local path.
//!
//! ## Mirror Flow
//!
//! 1. **Dispatch**: stat the source and pick File Sync or Folder Sync
//! 2. **Sync**: run it to completion; a folder fans out over its whole subtree
//! 3. **Report**: collect the outcome, timing and every failed node path
//!
//! Nothing is retried and nothing is cancelled: a started mirror always runs
//! to its single terminal outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use zkmirror_core::config::Config;
use zkmirror_core::domain::{NodePath, RequestId, SyncError, SyncFailures};
use zkmirror_core::ports::{EntryKind, ICoordinationStore, ILocalFileSystem};
use zkmirror_core::usecases::{
    destination_path, SyncFileUseCase, SyncFolderUseCase, UpsertNodeUseCase,
};

use crate::filesystem::LocalFileSystemAdapter;

// ============================================================================
// SyncRequest / MirrorReport
// ============================================================================

/// A local path to mirror under a node prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Local file or directory
    pub source: PathBuf,
    /// Existing node the source is mirrored under
    pub destination: NodePath,
}

impl SyncRequest {
    pub fn new(source: impl Into<PathBuf>, destination: NodePath) -> Self {
        Self {
            source: source.into(),
            destination,
        }
    }
}

/// Summary of one completed mirror
#[derive(Debug)]
pub struct MirrorReport {
    pub request_id: RequestId,
    pub source: PathBuf,
    pub prefix: NodePath,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Top-level node written, or every failed node path
    pub outcome: Result<NodePath, SyncFailures>,
}

impl MirrorReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Node the source was mirrored to, on success
    pub fn destination(&self) -> Option<&NodePath> {
        self.outcome.as_ref().ok()
    }

    pub fn failures(&self) -> Option<&SyncFailures> {
        self.outcome.as_ref().err()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().map_or(0, SyncFailures::len)
    }
}

// ============================================================================
// MirrorEngine
// ============================================================================

/// Entry point for mirroring local paths into a coordination store
///
/// ## Dependencies
///
/// - `filesystem`: classifies the source before dispatch
/// - `files` / `folders`: the sync use cases, sharing one upsert (and so one
///   write limit)
pub struct MirrorEngine {
    filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    files: Arc<SyncFileUseCase>,
    folders: Arc<SyncFolderUseCase>,
}

impl MirrorEngine {
    /// Creates a new `MirrorEngine` with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Coordination store nodes are written to
    /// * `filesystem` - Local tree the sources are read from
    /// * `config` - Application configuration for sync settings
    pub fn new(
        store: Arc<dyn ICoordinationStore + Send + Sync>,
        filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        config: &Config,
    ) -> Self {
        let upsert = Arc::new(
            UpsertNodeUseCase::new(store)
                .with_write_limit(config.sync.max_concurrent_writes as usize),
        );
        let files = Arc::new(SyncFileUseCase::new(
            Arc::clone(&filesystem),
            Arc::clone(&upsert),
        ));
        let folders = Arc::new(SyncFolderUseCase::new(Arc::clone(&filesystem), upsert));
        Self {
            filesystem,
            files,
            folders,
        }
    }

    /// Creates an engine over the real filesystem, honoring
    /// `sync.follow_symlinks`
    pub fn with_local_filesystem(
        store: Arc<dyn ICoordinationStore + Send + Sync>,
        config: &Config,
    ) -> Self {
        let filesystem =
            LocalFileSystemAdapter::new().with_follow_symlinks(config.sync.follow_symlinks);
        Self::new(store, Arc::new(filesystem), config)
    }

    /// Mirrors the request's source and returns the top-level node written
    ///
    /// A regular file goes through File Sync, a directory through Folder Sync.
    ///
    /// # Errors
    /// Every failed node path; a source that is missing or neither a file nor
    /// a directory fails as a whole
    pub async fn sync(&self, request: SyncRequest) -> Result<NodePath, SyncFailures> {
        let SyncRequest {
            source,
            destination: prefix,
        } = request;
        let target = destination_path(&source, &prefix).unwrap_or_else(|_| prefix.clone());
        let fail = |error: SyncError| SyncFailures::single(target.clone(), error);

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

        match state.kind {
            EntryKind::File => self
                .files
                .execute(&source, &prefix)
                .await
                .map_err(SyncFailures::from),
            EntryKind::Directory => self.folders.execute(source, prefix).await,
            kind @ (EntryKind::Symlink | EntryKind::Other) => {
                Err(fail(SyncError::InvalidSource {
                    path: source,
                    reason: format!("cannot mirror a {}", kind.as_str()),
                }))
            }
        }
    }

    /// Mirrors the request and reports timing alongside the outcome
    pub async fn mirror(&self, request: SyncRequest) -> MirrorReport {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "mirror",
            request_id = %request_id,
            source = %request.source.display(),
            prefix = %request.destination,
        );

        async move {
            let source = request.source.clone();
            let prefix = request.destination.clone();
            let started_at = Utc::now();
            let clock = Instant::now();
            info!("mirror started");

            let outcome = self.sync(request).await;
            let duration = clock.elapsed();

            match &outcome {
                Ok(destination) => info!(
                    %destination,
                    duration_ms = duration.as_millis() as u64,
                    "mirror completed"
                ),
                Err(failures) => warn!(
                    failed = failures.len(),
                    duration_ms = duration.as_millis() as u64,
                    "mirror completed with failures"
                ),
            }

            MirrorReport {
                request_id,
                source,
                prefix,
                started_at,
                duration,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    /// Starts a mirror in the background
    ///
    /// Exactly one of `on_success` and `on_failure` is called, once, when the
    /// mirror reaches its outcome.
    pub fn submit<S, F>(
        self: &Arc<Self>,
        request: SyncRequest,
        on_success: S,
        on_failure: F,
    ) -> JoinHandle<()>
    where
        S: FnOnce(NodePath) + Send + 'static,
        F: FnOnce(SyncFailures) + Send + 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(
            async move {
                match engine.mirror(request).await.outcome {
                    Ok(destination) => on_success(destination),
                    Err(failures) => on_failure(failures),
                }
            }
            .in_current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str) -> NodePath {
        NodePath::new(path.to_string()).unwrap()
    }

    fn report(outcome: Result<NodePath, SyncFailures>) -> MirrorReport {
        MirrorReport {
            request_id: RequestId::new(),
            source: PathBuf::from("/src/cfg"),
            prefix: node("/app"),
            started_at: Utc::now(),
            duration: Duration::from_millis(3),
            outcome,
        }
    }

    #[test]
    fn test_successful_report() {
        let report = report(Ok(node("/app/cfg")));
        assert!(report.is_success());
        assert_eq!(report.destination(), Some(&node("/app/cfg")));
        assert_eq!(report.failure_count(), 0);
        assert!(report.failures().is_none());
    }

    #[test]
    fn test_failed_report() {
        let failures = SyncFailures::single(
            node("/app/cfg/a"),
            SyncError::Interrupted {
                path: node("/app/cfg/a"),
            },
        );
        let report = report(Err(failures));
        assert!(!report.is_success());
        assert!(report.destination().is_none());
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn test_sync_request_new() {
        let request = SyncRequest::new("/src/cfg", node("/app"));
        assert_eq!(request.source, PathBuf::from("/src/cfg"));
        assert_eq!(request.destination, node("/app"));
    }
}
