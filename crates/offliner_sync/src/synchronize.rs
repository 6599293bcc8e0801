//! Pushing locally changed objects back to remote storage.

use crate::migrate;
use crate::store::NodeStore;
use offliner_core::{
    Conflict, ConflictPhase, KeySpace, NodeState, NodeVisitor, SyncNode, VisitResult, WalkResult,
};

/// Visitor that synchronizes local-keyed objects into a remote store.
///
/// The mirror of [`OffliningVisitor`](crate::OffliningVisitor): the local
/// version is compared against the entry's local baseline, and changed
/// objects are saved remotely under their remote identity. The remote store
/// rejects the save if the remote row moved on since the last sync, which
/// surfaces as a `Synchronize` conflict.
pub struct ServerSynchronizingVisitor<S> {
    remote: S,
}

impl<S> ServerSynchronizingVisitor<S> {
    /// Creates a visitor writing to `remote`.
    pub fn new(remote: S) -> Self {
        Self { remote }
    }

    /// Gets the remote store.
    pub fn store(&self) -> &S {
        &self.remote
    }
}

impl<N, S> NodeVisitor<N> for ServerSynchronizingVisitor<S>
where
    N: SyncNode,
    S: NodeStore<N>,
{
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState> {
        migrate::classify(node, KeySpace::Local)
    }

    fn visit(&mut self, node: &N) -> VisitResult<N> {
        migrate::migrate(&self.remote, ConflictPhase::Synchronize, node)
    }

    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N> {
        Conflict::dependent_failure(
            ConflictPhase::Synchronize,
            node.clone(),
            failing_child.clone(),
        )
    }
}
