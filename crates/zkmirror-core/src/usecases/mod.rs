//! Use cases (interactors) for zkmirror
//!
//! This module contains the application use cases that mirror local entries
//! into the coordination store through the port interfaces.
//!
//! ## Use Cases
//!
//! - [`UpsertNodeUseCase`] - Create-or-update of one node with a version check
//! - [`SyncFileUseCase`] - Single file mirroring
//! - [`SyncFolderUseCase`] - Recursive, concurrent directory mirroring
//!
//! [`PendingGroup`] is the fan-in primitive the folder sync uses to wait for
//! its children and collect their failures.

pub mod pending_group;
pub mod sync_file;
pub mod sync_folder;
pub mod upsert_node;

#[cfg(test)]
pub(crate) mod testing;

pub use pending_group::{PendingGroup, PendingOutcome, Registration};
pub use sync_file::{destination_path, SyncFileUseCase};
pub use sync_folder::{FolderSync, SyncFolderUseCase};
pub use upsert_node::UpsertNodeUseCase;
