//! In-memory implementation of ICoordinationStore
//!
//! Nodes live in a path-ordered map guarded by a `RwLock`. The root node `/`
//! always exists. Every operation optionally sleeps for a configured latency
//! before touching the map, so concurrent callers really interleave.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::trace;

use zkmirror_core::domain::{Acl, CreateMode, NodePath, NodeStat, RemoteOperation, StatusCode};
use zkmirror_core::ports::{ICoordinationStore, StoreResult};

/// A stored node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredNode {
    pub data: Vec<u8>,
    pub version: i32,
}

impl StoredNode {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, version: 0 }
    }

    fn stat(&self) -> NodeStat {
        NodeStat {
            version: self.version,
            data_length: self.data.len(),
        }
    }
}

/// A one-shot failure armed with [`MemoryCoordinationStore::fail_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub operation: RemoteOperation,
    pub path: NodePath,
    pub code: StatusCode,
}

/// Counters of the calls served so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub exists: u64,
    pub creates: u64,
    pub updates: u64,
}

impl StoreStats {
    /// Number of successful writes
    pub fn writes(&self) -> u64 {
        self.creates + self.updates
    }
}

/// Coordination store emulated in process memory
pub struct MemoryCoordinationStore {
    nodes: RwLock<BTreeMap<NodePath, StoredNode>>,
    faults: Mutex<Vec<Fault>>,
    latency: Option<Duration>,
    exists_calls: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
}

impl MemoryCoordinationStore {
    /// Creates a namespace holding only the root node
    pub fn new() -> Self {
        Self::with_nodes(BTreeMap::new())
    }

    pub(crate) fn with_nodes(mut nodes: BTreeMap<NodePath, StoredNode>) -> Self {
        nodes
            .entry(NodePath::root())
            .or_insert_with(|| StoredNode::new(Vec::new()));
        Self {
            nodes: RwLock::new(nodes),
            faults: Mutex::new(Vec::new()),
            latency: None,
            exists_calls: AtomicU64::new(0),
            creates: AtomicU64::new(0),
            updates: AtomicU64::new(0),
        }
    }

    /// Delays every operation by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = (!latency.is_zero()).then_some(latency);
        self
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeMap<NodePath, StoredNode>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<NodePath, StoredNode>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Makes the next `operation` on `path` fail with `code`
    ///
    /// Faults are consumed in the order they were armed.
    pub fn fail_next(&self, operation: RemoteOperation, path: NodePath, code: StatusCode) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Fault {
                operation,
                path,
                code,
            });
    }

    /// Faults armed but not yet triggered
    pub fn pending_faults(&self) -> Vec<Fault> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_fault(&self, operation: RemoteOperation, path: &NodePath) -> Option<StatusCode> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let index = faults
            .iter()
            .position(|f| f.operation == operation && &f.path == path)?;
        let fault = faults.remove(index);
        trace!(%path, %operation, code = %fault.code, "injected fault");
        Some(fault.code)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    // ------------------------------------------------------------------
    // Direct access
    // ------------------------------------------------------------------

    /// Bumps a node's version without changing its payload
    ///
    /// Simulates another client writing the node, so a later `set_data` with
    /// the previously observed version is rejected.
    pub fn touch(&self, path: &NodePath) -> StoreResult<NodeStat> {
        let mut nodes = self.write();
        let node = nodes.get_mut(path).ok_or(StatusCode::NoNode)?;
        node.version = node.version.wrapping_add(1);
        Ok(node.stat())
    }

    /// Creates `path` and any missing ancestors with empty payloads
    ///
    /// Existing nodes are left untouched. Returns the number of nodes created.
    pub fn ensure_path(&self, path: &NodePath) -> usize {
        let mut missing = Vec::new();
        let mut cursor = Some(path.clone());
        let mut nodes = self.write();
        while let Some(current) = cursor {
            if nodes.contains_key(&current) {
                break;
            }
            cursor = current.parent();
            missing.push(current);
        }
        let created = missing.len();
        for path in missing.into_iter().rev() {
            nodes.insert(path, StoredNode::new(Vec::new()));
        }
        created
    }

    /// Payload of a node, if present
    pub fn get_data(&self, path: &NodePath) -> Option<Vec<u8>> {
        self.read().get(path).map(|node| node.data.clone())
    }

    /// Metadata of a node, if present
    pub fn stat(&self, path: &NodePath) -> Option<NodeStat> {
        self.read().get(path).map(StoredNode::stat)
    }

    /// Immediate children of `path`, in path order
    pub fn children(&self, path: &NodePath) -> Vec<NodePath> {
        self.read()
            .keys()
            .filter(|candidate| candidate.parent().as_ref() == Some(path))
            .cloned()
            .collect()
    }

    /// Every node path, root included, in path order
    pub fn paths(&self) -> Vec<NodePath> {
        self.read().keys().cloned().collect()
    }

    /// Number of nodes, root included
    pub fn node_count(&self) -> usize {
        self.read().len()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            exists: self.exists_calls.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ICoordinationStore for MemoryCoordinationStore {
    async fn exists(&self, path: &NodePath) -> StoreResult<NodeStat> {
        self.delay().await;
        self.exists_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(code) = self.take_fault(RemoteOperation::Exists, path) {
            return Err(code);
        }
        self.read().get(path).map(StoredNode::stat).ok_or(StatusCode::NoNode)
    }

    async fn create(
        &self,
        path: &NodePath,
        data: &[u8],
        _acl: Acl,
        _mode: CreateMode,
    ) -> StoreResult<NodePath> {
        self.delay().await;
        if let Some(code) = self.take_fault(RemoteOperation::Create, path) {
            return Err(code);
        }

        let mut nodes = self.write();
        if nodes.contains_key(path) {
            return Err(StatusCode::NodeExists);
        }
        // Only the root has no parent, and the root always exists.
        let parent = path.parent().ok_or(StatusCode::NodeExists)?;
        if !nodes.contains_key(&parent) {
            trace!(%path, %parent, "parent missing");
            return Err(StatusCode::NoNode);
        }
        nodes.insert(path.clone(), StoredNode::new(data.to_vec()));
        self.creates.fetch_add(1, Ordering::Relaxed);
        trace!(%path, bytes = data.len(), "node created");
        Ok(path.clone())
    }

    async fn set_data(
        &self,
        path: &NodePath,
        data: &[u8],
        expected_version: i32,
    ) -> StoreResult<NodeStat> {
        self.delay().await;
        if let Some(code) = self.take_fault(RemoteOperation::SetData, path) {
            return Err(code);
        }

        let mut nodes = self.write();
        let node = nodes.get_mut(path).ok_or(StatusCode::NoNode)?;
        if node.version != expected_version {
            trace!(%path, expected_version, actual = node.version, "version mismatch");
            return Err(StatusCode::BadVersion);
        }
        node.data = data.to_vec();
        node.version = node.version.wrapping_add(1);
        self.updates.fetch_add(1, Ordering::Relaxed);
        trace!(%path, version = node.version, "node updated");
        Ok(node.stat())
    }
}
