//! Domain entities and business logic
//!
//! This module contains the core domain types for zkmirror:
//! - Newtypes for validated node paths and request identifiers
//! - Remote node metadata and coordination store status codes
//! - Sync failure types and their per-path aggregation
//! - Domain-specific error types

pub mod errors;
pub mod failure;
pub mod newtypes;
pub mod node;

// Re-export commonly used types
pub use errors::DomainError;
pub use failure::{SyncError, SyncFailure, SyncFailures};
pub use newtypes::*;
pub use node::{Acl, CreateMode, NodeStat, RemoteOperation, StatusCode};
