//! Sync failure types
//!
//! Every failure is tagged with the remote path it concerns. A single file
//! sync reports one [`SyncFailure`]; a folder sync aggregates all of its
//! descendants' failures into one [`SyncFailures`] map.

use std::collections::btree_map::{self, BTreeMap};
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::errors::DomainError;
use super::newtypes::NodePath;
use super::node::{RemoteOperation, StatusCode};

/// Reason a single node could not be synchronized
#[derive(Debug, Error)]
pub enum SyncError {
    /// The coordination store answered with an unexpected status
    #[error("{operation} on {path} failed: {code}")]
    Remote {
        path: NodePath,
        operation: RemoteOperation,
        code: StatusCode,
    },

    /// The local source could not be read or listed
    #[error("I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A file sync was requested for something that is not a regular file
    #[error("Not a regular file: {}", .path.display())]
    NotARegularFile { path: PathBuf },

    /// A folder sync was requested for something that is not a directory
    #[error("Not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    /// The source path has no usable base name
    #[error("Invalid source {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// The destination path failed validation
    #[error("Invalid destination: {0}")]
    InvalidDestination(#[from] DomainError),

    /// The child task ended without reporting an outcome
    #[error("Sync of {path} was interrupted")]
    Interrupted { path: NodePath },
}

impl SyncError {
    /// Wrap an unexpected remote status
    pub fn remote(path: NodePath, operation: RemoteOperation, code: StatusCode) -> Self {
        SyncError::Remote {
            path,
            operation,
            code,
        }
    }

    /// Wrap a local I/O failure reported by the filesystem port
    pub fn local_io(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Remote status code, if this is a remote failure
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SyncError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if an optimistic update lost against a concurrent writer
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        self.status() == Some(StatusCode::BadVersion)
    }
}

/// One failed path with its error
#[derive(Debug, Error)]
#[error("{path}: {error}")]
pub struct SyncFailure {
    pub path: NodePath,
    #[source]
    pub error: SyncError,
}

impl SyncFailure {
    pub fn new(path: NodePath, error: SyncError) -> Self {
        Self { path, error }
    }
}

/// Aggregated failures of a folder sync, keyed by remote path
///
/// Ordered by path so reports are deterministic regardless of the order in
/// which concurrent children completed.
#[derive(Debug, Default)]
pub struct SyncFailures(BTreeMap<NodePath, SyncError>);

impl SyncFailures {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A map holding exactly one failure
    #[must_use]
    pub fn single(path: NodePath, error: SyncError) -> Self {
        let mut failures = Self::new();
        failures.insert(path, error);
        failures
    }

    /// Record a failure; a later failure for the same path replaces the earlier one
    pub fn insert(&mut self, path: NodePath, error: SyncError) {
        self.0.insert(path, error);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&SyncError> {
        self.0.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &NodePath) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, NodePath, SyncError> {
        self.0.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &NodePath> {
        self.0.keys()
    }
}

impl fmt::Display for SyncFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        write!(
            f,
            "{} path{} failed to sync",
            count,
            if count == 1 { "" } else { "s" }
        )
    }
}

impl StdError for SyncFailures {}

impl From<SyncFailure> for SyncFailures {
    fn from(failure: SyncFailure) -> Self {
        Self::single(failure.path, failure.error)
    }
}

impl IntoIterator for SyncFailures {
    type Item = (NodePath, SyncError);
    type IntoIter = btree_map::IntoIter<NodePath, SyncError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SyncFailures {
    type Item = (&'a NodePath, &'a SyncError);
    type IntoIter = btree_map::Iter<'a, NodePath, SyncError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(NodePath, SyncError)> for SyncFailures {
    fn from_iter<I: IntoIterator<Item = (NodePath, SyncError)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
