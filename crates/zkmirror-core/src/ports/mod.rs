//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICoordinationStore`] - Node namespace of the coordination service
//! - [`ILocalFileSystem`] - Local tree being mirrored

pub mod coordination_store;
pub mod local_filesystem;

pub use coordination_store::{ICoordinationStore, StoreResult};
pub use local_filesystem::{DirEntry, EntryKind, FileSystemState, ILocalFileSystem};
