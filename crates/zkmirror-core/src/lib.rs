//! zkmirror Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `NodePath`, `NodeStat`, `StatusCode`, `SyncError`, `SyncFailures`
//! - **Use cases** - `UpsertNodeUseCase`, `SyncFileUseCase`, `SyncFolderUseCase`
//! - **Completion tracking** - `PendingGroup`, the fan-in of a folder sync
//! - **Port definitions** - Traits for adapters: `ICoordinationStore`, `ILocalFileSystem`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure value types with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases drive the ports to mirror a local tree into a coordination
//! service namespace.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
