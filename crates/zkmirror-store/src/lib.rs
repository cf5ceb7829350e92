//! zkmirror Store - Emulated coordination service namespace
//!
//! An in-process implementation of the `ICoordinationStore` port:
//! - Versioned nodes with the service's create/update/exists semantics
//! - Fault injection and external modification for exercising failure paths
//! - JSON snapshots so a namespace survives between CLI runs
//!
//! ## Architecture
//!
//! This crate is a driven (secondary) adapter in the hexagonal architecture.
//! It stands in for a real coordination service client; the use cases in
//! `zkmirror-core` cannot tell the two apart.
//!
//! ## Key Components
//!
//! - [`MemoryCoordinationStore`] - Full `ICoordinationStore` implementation
//! - [`Snapshot`] - Serializable image of a namespace
//! - [`StoreError`] - Error types for snapshot persistence
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use zkmirror_store::MemoryCoordinationStore;
//!
//! # fn example() -> Result<(), zkmirror_store::StoreError> {
//! let path = Path::new("/home/user/.local/share/zkmirror/namespace.json");
//! let store = MemoryCoordinationStore::load_or_empty(path)?;
//! // Use store as ICoordinationStore, then persist it again
//! store.save(path)?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod memory;
pub mod snapshot;

pub use memory::{Fault, MemoryCoordinationStore, StoreStats};
pub use snapshot::{Snapshot, SnapshotNode};

/// Errors that can occur while persisting or restoring a namespace
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The snapshot file could not be read or written
    #[error("Snapshot I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON for the expected layout
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot parses but describes an impossible namespace
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
