//! # Offliner Sync
//!
//! Offline/online synchronization of object graphs.
//!
//! This crate provides:
//! - The `NodeStore` storage contract and an in-memory store
//! - `OffliningVisitor`: remote objects into local storage
//! - `ServerSynchronizingVisitor`: local changes back to remote storage
//! - `ForcedSynchronizingVisitor`: unconditional overwrite of one node
//! - `SyncSession`: runs the visitors and resolves reported conflicts
//!
//! ## Architecture
//!
//! Every operation is one [`GraphWalker`](offliner_core::GraphWalker) run
//! with one visitor. Visitors compare an object's current version against
//! the baselines stored in its `MappingEntry`:
//! 1. Ahead of the baseline: rewrite identity, save, advance baselines
//! 2. Equal to the baseline: rewrite identity only
//! 3. Behind the baseline: report a conflict
//!
//! ## Key Invariants
//!
//! - Storage failures become conflicts, never panics or aborts
//! - A node whose save failed keeps its original key and version
//! - Each node save is independent; there is no cross-node rollback

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod forced;
mod migrate;
mod offline;
mod session;
mod store;
mod synchronize;

pub use config::SyncConfig;
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use forced::ForcedSynchronizingVisitor;
pub use offline::OffliningVisitor;
pub use session::{SyncOutcome, SyncSession, SyncStats};
pub use store::{InMemoryStore, NodeStore, StoredHead};
pub use synchronize::ServerSynchronizingVisitor;
