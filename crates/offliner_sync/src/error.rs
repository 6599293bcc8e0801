//! Error types for stores and sync sessions.

use offliner_core::{KeySpace, UniqueKey, Version, WalkError};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for sync sessions.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by a [`NodeStore`](crate::NodeStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row exists for the key.
    #[error("no stored object for {key}")]
    NotFound {
        /// Key that was looked up.
        key: UniqueKey,
    },

    /// Optimistic lock failure: the row changed since the node was read.
    #[error("stale version for {key}: node carries {expected}, store holds {actual}")]
    StaleVersion {
        /// Key of the saved node.
        key: UniqueKey,
        /// Version carried by the node.
        expected: Version,
        /// Version currently stored.
        actual: Version,
    },

    /// The node's key belongs to another identity space.
    #[error("key {key} does not belong to the {space} store")]
    ForeignKey {
        /// Key of the saved node.
        key: UniqueKey,
        /// Space of the store.
        space: KeySpace,
    },

    /// The store refused the write.
    #[error("save rejected for {key}: {reason}")]
    Rejected {
        /// Key of the saved node.
        key: UniqueKey,
        /// Reason given by the store.
        reason: String,
    },

    /// The store has no identifiers left to mint.
    #[error("{space} store has no identifiers left")]
    IdsExhausted {
        /// Space of the exhausted store.
        space: KeySpace,
    },

    /// The store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the failure is an optimistic-locking conflict that a
    /// forced overwrite can settle.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::StaleVersion { .. })
    }
}

/// Errors that can occur during sync sessions.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The walker aborted the run.
    #[error("walk aborted: {0}")]
    Walk(#[from] WalkError),

    /// The node's mapping entry names another object.
    #[error("mapping entry expects {expected}, node carries {found}")]
    MappingMismatch {
        /// Key recorded in the mapping entry.
        expected: UniqueKey,
        /// Key carried by the node.
        found: UniqueKey,
    },

    /// A conflict has no node with a local identity to force.
    #[error("conflict cannot be forced: {0}")]
    Unforceable(String),
}
