//! JSON snapshots of a namespace
//!
//! A snapshot lists every node with its version and payload. UTF-8 payloads
//! are stored as JSON strings so snapshots stay readable; anything else is
//! stored as a byte array.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use zkmirror_core::domain::NodePath;

use crate::memory::{MemoryCoordinationStore, StoredNode};
use crate::StoreError;

/// Current snapshot layout
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Serializable image of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: u32,
    pub nodes: Vec<SnapshotNode>,
}

/// One node of a [`Snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub path: NodePath,
    pub version: i32,
    pub data: Payload,
}

/// Node payload as written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Payload::Text(text),
            Err(e) => Payload::Binary(e.into_bytes()),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }
}

impl MemoryCoordinationStore {
    /// Captures every node, root included, in path order
    pub fn snapshot(&self) -> Snapshot {
        let nodes = self
            .read()
            .iter()
            .map(|(path, node)| SnapshotNode {
                path: path.clone(),
                version: node.version,
                data: Payload::from_bytes(node.data.clone()),
            })
            .collect();
        Snapshot {
            format: SNAPSHOT_FORMAT,
            nodes,
        }
    }

    /// Rebuilds a namespace from a snapshot
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSnapshot` for an unknown format, a
    /// duplicated path, or a node whose parent is missing
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(StoreError::InvalidSnapshot(format!(
                "unsupported format {} (expected {SNAPSHOT_FORMAT})",
                snapshot.format
            )));
        }

        let mut nodes = BTreeMap::new();
        for entry in snapshot.nodes {
            let node = StoredNode {
                data: entry.data.into_bytes(),
                version: entry.version,
            };
            if nodes.insert(entry.path.clone(), node).is_some() {
                return Err(StoreError::InvalidSnapshot(format!(
                    "duplicate node {}",
                    entry.path
                )));
            }
        }

        if let Some(orphan) = nodes.keys().find(|path| {
            path.parent()
                .is_some_and(|parent| !parent.is_root() && !nodes.contains_key(&parent))
        }) {
            return Err(StoreError::InvalidSnapshot(format!(
                "node {orphan} has no parent"
            )));
        }

        Ok(Self::with_nodes(nodes))
    }

    /// Writes the namespace to `path` as pretty-printed JSON
    ///
    /// The file is replaced atomically; missing parent directories are created.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, json).map_err(io_error)?;
        std::fs::rename(&staging, path).map_err(io_error)?;

        debug!(path = %path.display(), nodes = self.node_count(), "namespace saved");
        Ok(())
    }

    /// Reads a namespace saved with [`MemoryCoordinationStore::save`]
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot = serde_json::from_slice(&content)?;
        let store = Self::from_snapshot(snapshot)?;
        debug!(path = %path.display(), nodes = store.node_count(), "namespace loaded");
        Ok(store)
    }

    /// Like [`MemoryCoordinationStore::load`], but a missing file yields an
    /// empty namespace
    pub fn load_or_empty(path: &Path) -> Result<Self, StoreError> {
        match Self::load(path) {
            Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::new())
            }
            other => other,
        }
    }
}
