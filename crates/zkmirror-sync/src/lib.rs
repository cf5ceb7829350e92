//! zkmirror Sync - Mirroring engine and local filesystem adapter
//!
//! Provides:
//! - A `tokio::fs` implementation of the `ILocalFileSystem` port
//! - The engine that mirrors a local file or directory tree into a
//!   coordination store
//!
//! ## Modules
//!
//! - [`engine`] - Request dispatch, reporting and background submission
//! - [`filesystem`] - Local filesystem adapter with a symlink policy

pub mod engine;
pub mod filesystem;

pub use engine::{MirrorEngine, MirrorReport, SyncRequest};
pub use filesystem::LocalFileSystemAdapter;
