//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! currently validation failures of node paths.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid node path format or component
    #[error("Invalid node path: {0}")]
    InvalidNodePath(String),
}
