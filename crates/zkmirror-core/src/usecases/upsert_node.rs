//! Node upsert use case
//!
//! Writes a payload to one node of the coordination store, creating the node
//! when it does not exist yet and otherwise updating it with an optimistic
//! version check.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, trace};

use crate::domain::newtypes::NodePath;
use crate::domain::node::{Acl, CreateMode, RemoteOperation, StatusCode};
use crate::domain::SyncError;
use crate::ports::ICoordinationStore;

/// Use case for writing one node
///
/// Exactly one remote write is issued per successful call. Nothing is retried:
/// a version conflict or any unexpected status is returned to the caller.
pub struct UpsertNodeUseCase {
    store: Arc<dyn ICoordinationStore + Send + Sync>,
    write_permits: Option<Arc<Semaphore>>,
}

impl UpsertNodeUseCase {
    /// Creates a new UpsertNodeUseCase without a concurrency cap
    pub fn new(store: Arc<dyn ICoordinationStore + Send + Sync>) -> Self {
        Self {
            store,
            write_permits: None,
        }
    }

    /// Limits the number of upserts in flight at once
    ///
    /// `0` keeps the fan-out unbounded.
    #[must_use]
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_permits = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    /// Creates or updates the node at `path` with `data`
    ///
    /// This method:
    /// 1. Checks whether the node exists
    /// 2. Updates it with the observed version if it does
    /// 3. Creates it as a persistent node with the open access policy if it does not
    ///
    /// # Returns
    ///
    /// The path of the written node
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Remote` tagged with `path` and the failing primitive
    /// for any status other than the ones the protocol expects
    #[instrument(skip(self, data), fields(path = %path, bytes = data.len()))]
    pub async fn execute(&self, path: &NodePath, data: &[u8]) -> Result<NodePath, SyncError> {
        // The permit is held across every remote call of this upsert.
        let _permit = match &self.write_permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| SyncError::Interrupted { path: path.clone() })?,
            ),
            None => None,
        };

        trace!("checking node existence");
        match self.store.exists(path).await {
            Ok(stat) => {
                trace!(version = stat.version, "node exists, updating data");
                let updated = self
                    .store
                    .set_data(path, data, stat.version)
                    .await
                    .map_err(|code| SyncError::remote(path.clone(), RemoteOperation::SetData, code))?;
                debug!(version = updated.version, "node updated");
                Ok(path.clone())
            }
            Err(StatusCode::NoNode) => {
                trace!("node not found, creating");
                let created = self
                    .store
                    .create(path, data, Acl::Open, CreateMode::Persistent)
                    .await
                    .map_err(|code| SyncError::remote(path.clone(), RemoteOperation::Create, code))?;
                debug!("node created");
                Ok(created)
            }
            Err(code) => {
                debug!(%code, "unexpected status from existence check");
                Err(SyncError::remote(path.clone(), RemoteOperation::Exists, code))
            }
        }
    }
}
