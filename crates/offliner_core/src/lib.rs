//! # Offliner Core
//!
//! Object-graph traversal and identity types for Offliner.
//!
//! This crate provides:
//! - `UniqueKey`, `KeyType`, `Version` and `MappingEntry` identity types
//! - Capability traits through which domain objects expose their links,
//!   keys, versions and mapping entries
//! - `GraphWalker`, a depth-first, cycle-safe traversal engine driving a
//!   pluggable `NodeVisitor`
//! - `Conflict` and the serializable `ConflictReport`
//!
//! This is a pure crate with no I/O operations. Storage is supplied by the
//! visitors built on top of it.
//!
//! ## Key Invariants
//!
//! - Every reachable node is pre-visited at most once per run
//! - A node still `Pending` after processing is an engine bug
//! - A node with a failed child is error-marked, never visited
//! - Traversal state lives in the walker, never on the domain objects

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capability;
mod config;
mod conflict;
mod error;
mod mapping;
mod state;
mod types;
mod visitor;
mod walker;

pub use capability::{Identified, Linked, Mapped, SyncNode, Typed, Versioned};
pub use config::{WalkerConfig, DEFAULT_MAX_DEPTH};
pub use conflict::{Conflict, ConflictCause, ConflictPhase, ConflictReport, ConflictResolution};
pub use error::{ReportError, WalkError, WalkResult};
pub use mapping::MappingEntry;
pub use state::NodeState;
pub use types::{KeySpace, KeyType, UniqueKey, Version};
pub use visitor::{NodeError, NodeVisitor, VisitResult};
pub use walker::{GraphWalker, WalkStats};
