//! Coordination store port (driven/secondary port)
//!
//! This module defines the interface for the hierarchical namespace exposed by
//! a coordination service: a tree of named nodes, each holding a byte payload
//! and a data version.
//!
//! ## Design Notes
//!
//! - Failures are reported as the service's [`StatusCode`] rather than
//!   `anyhow::Error`: the upsert protocol branches on specific codes
//!   (`NoNode` selects the create path, `BadVersion` is a lost update).
//! - Uses `#[async_trait]` for async trait methods.
//! - Connection management, session handling and timeouts belong to the
//!   implementation; the use cases never retry.

use crate::domain::newtypes::NodePath;
use crate::domain::node::{Acl, CreateMode, NodeStat, StatusCode};

/// Result of a coordination store primitive
pub type StoreResult<T> = Result<T, StatusCode>;

/// Port trait for coordination service namespace operations
///
/// ## Implementation Notes
///
/// - `exists` returns `Err(StatusCode::NoNode)` for an absent node.
/// - `create` never creates missing parents: it returns
///   `Err(StatusCode::NoNode)` when the parent is absent and
///   `Err(StatusCode::NodeExists)` when the node is already present.
/// - `set_data` is a compare-and-swap on the data version: it returns
///   `Err(StatusCode::BadVersion)` when `expected_version` is stale.
/// - Calls may complete on any runtime worker thread; implementations must be
///   safe to call concurrently.
#[async_trait::async_trait]
pub trait ICoordinationStore: Send + Sync {
    /// Checks whether a node exists
    ///
    /// # Returns
    /// The node's metadata, including the version required by `set_data`
    async fn exists(&self, path: &NodePath) -> StoreResult<NodeStat>;

    /// Creates a node with the given payload
    ///
    /// # Arguments
    /// * `path` - Path of the new node; its parent must exist
    /// * `data` - Initial payload
    /// * `acl` - Access policy of the new node
    /// * `mode` - Node lifetime
    ///
    /// # Returns
    /// The path of the created node
    async fn create(
        &self,
        path: &NodePath,
        data: &[u8],
        acl: Acl,
        mode: CreateMode,
    ) -> StoreResult<NodePath>;

    /// Replaces a node's payload if its version still matches
    ///
    /// # Arguments
    /// * `path` - Path of an existing node
    /// * `data` - New payload
    /// * `expected_version` - Version observed by the preceding `exists`
    ///
    /// # Returns
    /// The node's metadata after the update
    async fn set_data(
        &self,
        path: &NodePath,
        data: &[u8],
        expected_version: i32,
    ) -> StoreResult<NodeStat>;
}
