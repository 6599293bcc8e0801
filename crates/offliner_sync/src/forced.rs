//! Overwriting one node on the remote side regardless of versions.

use crate::error::StoreError;
use crate::migrate;
use crate::store::NodeStore;
use crate::synchronize::ServerSynchronizingVisitor;
use offliner_core::{
    Conflict, ConflictPhase, KeySpace, KeyType, NodeState, NodeVisitor, SyncNode, UniqueKey,
    VisitResult, WalkError, WalkResult,
};
use tracing::{debug, info};

/// Synchronizing visitor that force-pushes one pinned node.
///
/// Every node except the pinned one goes through the normal
/// [`ServerSynchronizingVisitor`] path. For the pinned node no versions are
/// compared: the current remote head is fetched, stamped onto the node and
/// saved over, and both baselines move to the result.
///
/// The pin is a local identity. It matches a node carrying that key, or a
/// mapped node whose entry names it as the local key. The latter also
/// catches a node left remote-keyed by a failed offline run.
pub struct ForcedSynchronizingVisitor<S> {
    inner: ServerSynchronizingVisitor<S>,
    pinned: UniqueKey,
}

impl<S> ForcedSynchronizingVisitor<S> {
    /// Creates a visitor writing to `remote` that forces the node whose
    /// local key is `pinned`.
    pub fn new(remote: S, pinned: UniqueKey) -> Self {
        Self {
            inner: ServerSynchronizingVisitor::new(remote),
            pinned,
        }
    }

    /// Gets the pinned key.
    pub fn pinned(&self) -> &UniqueKey {
        &self.pinned
    }

    /// Gets the remote store.
    pub fn store(&self) -> &S {
        self.inner.store()
    }

    fn is_pinned<N: SyncNode>(&self, node: &N) -> bool {
        node.unique_key().as_ref() == Some(&self.pinned)
            || node
                .mapping_entry()
                .is_some_and(|entry| entry.local_key() == &self.pinned)
    }
}

impl<N, S> NodeVisitor<N> for ForcedSynchronizingVisitor<S>
where
    N: SyncNode,
    S: NodeStore<N>,
{
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState> {
        if node.key_type() != KeyType::Null
            && node.mapping_entry().is_some()
            && self.is_pinned(node)
        {
            return Ok(NodeState::Unseen);
        }
        self.inner.pre_visit(node)
    }

    fn visit(&mut self, node: &N) -> VisitResult<N> {
        if !self.is_pinned(node) {
            return self.inner.visit(node);
        }
        let Some(mut entry) = node.mapping_entry() else {
            debug!(key = %self.pinned, "pinned node is unmapped, synchronizing normally");
            return self.inner.visit(node);
        };

        let phase = ConflictPhase::Force;
        let key = node.unique_key().ok_or_else(|| WalkError::Unkeyed {
            entity_type: node.entity_type(),
        })?;
        migrate::check_mapping(&entry, key.space(), &key, phase, node)?;

        let remote = self.inner.store();
        let remote_key = entry.remote_key().clone();
        let head = match remote.find_by_id(remote_key.entity_type(), remote_key.id()) {
            Ok(Some(head)) => head,
            Ok(None) => {
                return Err(Conflict::new(phase)
                    .with_cause(StoreError::NotFound { key: remote_key })
                    .with_dependent(node.clone())
                    .into());
            }
            Err(err) => {
                return Err(Conflict::new(phase)
                    .with_cause(err)
                    .with_dependent(node.clone())
                    .into());
            }
        };

        let current = node.version();
        // A remote-keyed node carries no local version; the local row
        // keeps its baseline.
        let local_base = match key.space() {
            KeySpace::Local => current,
            KeySpace::Remote => entry.local_base(),
        };
        node.set_key(head.key.clone());
        node.set_version(head.version);
        let saved = migrate::save(remote, phase, node, &key, current)?;
        entry.advance(local_base, saved.version);
        node.set_mapping_entry(entry);
        info!(
            from = %key,
            to = %saved.key,
            overwritten = %head.version,
            version = %saved.version,
            "forced overwrite"
        );
        Ok(())
    }

    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N> {
        if self.is_pinned(node) {
            return Conflict::dependent_failure(
                ConflictPhase::Force,
                node.clone(),
                failing_child.clone(),
            );
        }
        self.inner.mark_error(node, failing_child)
    }
}
