//! Per-run node lifecycle state.

use serde::{Deserialize, Serialize};

/// Traversal state of a node within one walker run.
///
/// Legal transitions: `Unseen -> {Pending, Processed, Error}` and
/// `Pending -> {Processed, Error}`. `Processed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Not reached yet in this run.
    #[default]
    Unseen,
    /// Entered but not finished; children are being walked.
    Pending,
    /// Finished successfully.
    Processed,
    /// Finished with a failure of its own or of a descendant.
    Error,
}

impl NodeState {
    /// Returns true if no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Processed | NodeState::Error)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: NodeState) -> bool {
        match self {
            NodeState::Unseen => next != NodeState::Unseen,
            NodeState::Pending => next.is_terminal(),
            NodeState::Processed | NodeState::Error => false,
        }
    }
}
