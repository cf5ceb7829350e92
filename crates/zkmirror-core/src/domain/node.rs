//! Remote node types
//!
//! Value types describing nodes of the coordination service namespace and the
//! result codes its operations report.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result code reported by a coordination store operation
///
/// Numeric values follow the coordination service's wire codes so adapters
/// can map raw replies with [`StatusCode::from_code`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    #[error("ok")]
    Ok,
    #[error("system error")]
    SystemError,
    #[error("runtime inconsistency")]
    RuntimeInconsistency,
    #[error("data inconsistency")]
    DataInconsistency,
    #[error("connection loss")]
    ConnectionLoss,
    #[error("marshalling error")]
    MarshallingError,
    #[error("unimplemented")]
    Unimplemented,
    #[error("operation timeout")]
    OperationTimeout,
    #[error("bad arguments")]
    BadArguments,
    #[error("api error")]
    ApiError,
    /// The node (or, for `create`, its parent) does not exist
    #[error("no node")]
    NoNode,
    #[error("not authenticated")]
    NoAuth,
    /// The expected version did not match the node's current version
    #[error("bad version")]
    BadVersion,
    #[error("ephemeral nodes may not have children")]
    NoChildrenForEphemerals,
    #[error("node exists")]
    NodeExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid callback")]
    InvalidCallback,
    #[error("invalid acl")]
    InvalidAcl,
    #[error("auth failed")]
    AuthFailed,
    /// Any code this crate does not know by name
    #[error("unknown status code {0}")]
    Unknown(i32),
}

impl StatusCode {
    /// Map a raw numeric result code
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::SystemError,
            -2 => Self::RuntimeInconsistency,
            -3 => Self::DataInconsistency,
            -4 => Self::ConnectionLoss,
            -5 => Self::MarshallingError,
            -6 => Self::Unimplemented,
            -7 => Self::OperationTimeout,
            -8 => Self::BadArguments,
            -100 => Self::ApiError,
            -101 => Self::NoNode,
            -102 => Self::NoAuth,
            -103 => Self::BadVersion,
            -108 => Self::NoChildrenForEphemerals,
            -110 => Self::NodeExists,
            -111 => Self::NotEmpty,
            -112 => Self::SessionExpired,
            -113 => Self::InvalidCallback,
            -114 => Self::InvalidAcl,
            -115 => Self::AuthFailed,
            other => Self::Unknown(other),
        }
    }

    /// The raw numeric result code
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::SystemError => -1,
            Self::RuntimeInconsistency => -2,
            Self::DataInconsistency => -3,
            Self::ConnectionLoss => -4,
            Self::MarshallingError => -5,
            Self::Unimplemented => -6,
            Self::OperationTimeout => -7,
            Self::BadArguments => -8,
            Self::ApiError => -100,
            Self::NoNode => -101,
            Self::NoAuth => -102,
            Self::BadVersion => -103,
            Self::NoChildrenForEphemerals => -108,
            Self::NodeExists => -110,
            Self::NotEmpty => -111,
            Self::SessionExpired => -112,
            Self::InvalidCallback => -113,
            Self::InvalidAcl => -114,
            Self::AuthFailed => -115,
            Self::Unknown(code) => *code,
        }
    }
}

/// Node metadata observed by `exists` and returned by `set_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStat {
    /// Data version, incremented by every successful `set_data`
    pub version: i32,
    /// Payload length in bytes
    pub data_length: usize,
}

/// Access policy applied to created nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acl {
    /// World-readable and world-writable
    #[default]
    Open,
}

/// Lifetime of a created node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Survives the creating session
    #[default]
    Persistent,
}

/// Remote primitive that produced a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    Exists,
    Create,
    SetData,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOperation::Exists => write!(f, "exists"),
            RemoteOperation::Create => write!(f, "create"),
            RemoteOperation::SetData => write!(f, "set_data"),
        }
    }
}
