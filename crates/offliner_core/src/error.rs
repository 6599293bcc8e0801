//! Error types for the graph walker.

use crate::state::NodeState;
use crate::types::UniqueKey;
use thiserror::Error;

/// Result type for walker operations.
pub type WalkResult<T> = Result<T, WalkError>;

/// Fatal errors that abort a walker run.
///
/// Data-level problems are never reported through this type; they become
/// [`Conflict`](crate::Conflict) values in the run's result list. A
/// `WalkError` means either a precondition on the input graph was broken or
/// the walker/visitor pair has a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// A reachable node carries no unique key.
    #[error("node of type {entity_type} has no unique key")]
    Unkeyed {
        /// Entity type of the offending node.
        entity_type: String,
    },

    /// A node broke a precondition of the visitor processing it.
    #[error("precondition violated for {entity_type}: {message}")]
    Precondition {
        /// Entity type of the offending node.
        entity_type: String,
        /// Description of the violation.
        message: String,
    },

    /// A node state change that the lifecycle does not allow.
    #[error("illegal state transition for {key}: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Node whose state was changed.
        key: UniqueKey,
        /// State before the change.
        from: NodeState,
        /// Attempted state.
        to: NodeState,
    },

    /// Internal invariant of the engine broken.
    #[error("walker invariant violated: {message}")]
    InvariantViolation {
        /// Description of the violation.
        message: String,
    },

    /// The graph is deeper than the configured recursion limit.
    #[error("graph depth exceeds limit of {max_depth}")]
    DepthExceeded {
        /// Configured limit.
        max_depth: usize,
    },

    /// A mapping entry was built from keys in the wrong spaces.
    #[error("invalid mapping entry: {message}")]
    InvalidMapping {
        /// Description of the problem.
        message: String,
    },
}

impl WalkError {
    /// Creates a precondition error.
    pub fn precondition(entity_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Precondition {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Returns true if this error signals a bug in the walker or visitor
    /// rather than bad input.
    pub fn is_engine_bug(&self) -> bool {
        matches!(
            self,
            WalkError::IllegalTransition { .. } | WalkError::InvariantViolation { .. }
        )
    }
}

/// Errors from encoding or decoding conflict reports.
#[derive(Error, Debug)]
pub enum ReportError {
    /// CBOR encoding failed.
    #[error("report encoding failed: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("report decoding failed: {0}")]
    Decode(String),
}
