//! The visitor contract driven by the walker.

use crate::conflict::Conflict;
use crate::error::{WalkError, WalkResult};
use crate::state::NodeState;

/// Result of visiting one node.
pub type VisitResult<N> = Result<(), NodeError<N>>;

/// Failure of a single `visit` call.
#[derive(Debug)]
pub enum NodeError<N> {
    /// Expected, reportable failure. The walker records it and moves on.
    Conflict(Box<Conflict<N>>),
    /// Fatal failure. The walker aborts the whole run.
    Abort(WalkError),
}

impl<N> From<Conflict<N>> for NodeError<N> {
    fn from(conflict: Conflict<N>) -> Self {
        NodeError::Conflict(Box::new(conflict))
    }
}

impl<N> From<WalkError> for NodeError<N> {
    fn from(error: WalkError) -> Self {
        NodeError::Abort(error)
    }
}

/// Per-node strategy plugged into a [`GraphWalker`](crate::GraphWalker).
///
/// Implementations may mutate the domain graph freely but never see or
/// touch the walker's state map.
pub trait NodeVisitor<N> {
    /// Called once when a node is first reached, before its children.
    ///
    /// Return [`NodeState::Unseen`] for normal processing, or
    /// `Processed`/`Error` to settle the node without visiting it or its
    /// children.
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState>;

    /// Performs the node's work after all children succeeded.
    fn visit(&mut self, node: &N) -> VisitResult<N>;

    /// Builds the conflict for a node whose failure comes from a child.
    ///
    /// Must not attempt the node's own work.
    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N>;
}

impl<N, V> NodeVisitor<N> for &mut V
where
    V: NodeVisitor<N> + ?Sized,
{
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState> {
        (**self).pre_visit(node)
    }

    fn visit(&mut self, node: &N) -> VisitResult<N> {
        (**self).visit(node)
    }

    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N> {
        (**self).mark_error(node, failing_child)
    }
}
