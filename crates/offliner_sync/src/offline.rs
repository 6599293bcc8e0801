//! Moving remote objects into local storage.

use crate::migrate;
use crate::store::NodeStore;
use offliner_core::{
    Conflict, ConflictPhase, KeySpace, NodeState, NodeVisitor, SyncNode, VisitResult, WalkResult,
};

/// Visitor that offlines remote-keyed objects into a local store.
///
/// - A node without a mapping entry is inserted locally; the store mints
///   its local key and a new entry records both identities.
/// - A mapped node is compared against the entry's remote baseline. A newer
///   remote copy is saved over the local one, an unchanged one is only
///   rekeyed, an older one is reported as an `Offline` conflict.
/// - Nodes already carrying a local key are left alone.
pub struct OffliningVisitor<S> {
    local: S,
}

impl<S> OffliningVisitor<S> {
    /// Creates a visitor writing to `local`.
    pub fn new(local: S) -> Self {
        Self { local }
    }

    /// Gets the local store.
    pub fn store(&self) -> &S {
        &self.local
    }
}

impl<N, S> NodeVisitor<N> for OffliningVisitor<S>
where
    N: SyncNode,
    S: NodeStore<N>,
{
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState> {
        migrate::classify(node, KeySpace::Remote)
    }

    fn visit(&mut self, node: &N) -> VisitResult<N> {
        migrate::migrate(&self.local, ConflictPhase::Offline, node)
    }

    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N> {
        Conflict::dependent_failure(ConflictPhase::Offline, node.clone(), failing_child.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::StoreError;
    use offliner_core::{
        GraphWalker, Identified, KeyType, Mapped, MappingEntry, NodeError, Typed, UniqueKey,
        Version, Versioned,
    };
    use offliner_testkit::{order_graph, Entity};

    fn offline(root: &Entity, local: &InMemoryStore) -> Vec<Conflict<Entity>> {
        GraphWalker::new(OffliningVisitor::new(local))
            .run(root)
            .unwrap()
    }

    #[test]
    fn pre_visit_classifies_by_key_type() {
        let local = InMemoryStore::local();
        let mut visitor = OffliningVisitor::new(&local);

        assert_eq!(
            visitor.pre_visit(&Entity::remote("order", 1, 1)).unwrap(),
            NodeState::Unseen
        );
        assert_eq!(
            visitor.pre_visit(&Entity::local("order", 1, 1)).unwrap(),
            NodeState::Processed
        );
        assert!(visitor.pre_visit(&Entity::unkeyed("order")).is_err());
    }

    #[test]
    fn new_object_gets_local_key_and_mapping() {
        let local = InMemoryStore::local();
        let order = Entity::remote("order", 20, 5);

        let conflicts = offline(&order, &local);

        assert!(conflicts.is_empty());
        assert_eq!(order.key_type(), KeyType::Local);
        let entry = order.mapping_entry().unwrap();
        assert_eq!(entry.remote_key(), &UniqueKey::remote("order", 20));
        assert_eq!(entry.remote_base(), Version::new(5));
        assert_eq!(Some(entry.local_key().clone()), order.unique_key());
        assert_eq!(entry.local_base(), order.version());
        assert_eq!(local.save_count(), 1);
    }

    #[test]
    fn whole_graph_offlined_once_per_node() {
        let local = InMemoryStore::local();
        let graph = order_graph();

        let conflicts = offline(&graph.order, &local);

        assert!(conflicts.is_empty());
        assert_eq!(local.save_count(), 4);
        for entity in graph.all() {
            assert_eq!(entity.key_type(), KeyType::Local);
            assert!(entity.mapping_entry().is_some());
        }
    }

    #[test]
    fn second_run_is_noop() {
        let local = InMemoryStore::local();
        let graph = order_graph();
        offline(&graph.order, &local);

        let conflicts = offline(&graph.order, &local);

        assert!(conflicts.is_empty());
        assert_eq!(local.save_count(), 4);
    }

    fn mapped_remote_copy(local: &InMemoryStore, remote_version: u64, base: u64) -> Entity {
        let local_key = local.insert("order", 1, Version::new(2));
        let node = Entity::remote("order", 20, remote_version);
        node.set_mapping_entry(
            MappingEntry::new(
                local_key,
                UniqueKey::remote("order", 20),
                Version::new(2),
                Version::new(base),
            )
            .unwrap(),
        );
        node
    }

    #[test]
    fn unchanged_remote_copy_is_only_rekeyed() {
        let local = InMemoryStore::local();
        let node = mapped_remote_copy(&local, 5, 5);

        let conflicts = offline(&node, &local);

        assert!(conflicts.is_empty());
        assert_eq!(node.unique_key(), Some(UniqueKey::local("order", 1)));
        assert_eq!(node.version(), Version::new(2));
        assert_eq!(local.save_count(), 0);
    }

    #[test]
    fn newer_remote_copy_updates_local_row() {
        let local = InMemoryStore::local();
        let node = mapped_remote_copy(&local, 7, 5);

        let conflicts = offline(&node, &local);

        assert!(conflicts.is_empty());
        assert_eq!(node.unique_key(), Some(UniqueKey::local("order", 1)));
        assert_eq!(node.version(), Version::new(3));
        let entry = node.mapping_entry().unwrap();
        assert_eq!(entry.remote_base(), Version::new(7));
        assert_eq!(entry.local_base(), Version::new(3));
        assert_eq!(local.version_of(&UniqueKey::local("order", 1)), Some(Version::new(3)));
    }

    #[test]
    fn regressed_remote_copy_is_conflict() {
        let local = InMemoryStore::local();
        let node = mapped_remote_copy(&local, 3, 5);

        let mut walker = GraphWalker::new(OffliningVisitor::new(&local));
        let conflicts = walker.run(&node).unwrap();

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.phase, ConflictPhase::Offline);
        assert!(conflict.cause.is_none());
        assert!(conflict.dependent.as_ref().is_some_and(|n| n.same(&node)));
        assert_eq!(
            walker.state_of(&UniqueKey::remote("order", 20)),
            NodeState::Error
        );
        assert_eq!(node.key_type(), KeyType::Remote);
    }

    #[test]
    fn locally_modified_row_is_stale_conflict() {
        let local = InMemoryStore::local();
        let node = mapped_remote_copy(&local, 7, 5);
        // Someone saved the local row since the last sync.
        let edited = Entity::local("order", 1, 2);
        NodeStore::<Entity>::save_or_update(&local, &edited).unwrap();

        let conflicts = offline(&node, &local);

        assert_eq!(conflicts.len(), 1);
        let cause = conflicts[0].cause.as_ref().unwrap();
        assert!(cause
            .downcast_ref::<StoreError>()
            .is_some_and(StoreError::is_version_conflict));
        // Identity restored so the node can be retried.
        assert_eq!(node.unique_key(), Some(UniqueKey::remote("order", 20)));
        assert_eq!(node.version(), Version::new(7));
    }

    #[test]
    fn mismatched_mapping_is_conflict() {
        let local = InMemoryStore::local();
        let node = mapped_remote_copy(&local, 5, 5);
        node.set_key(UniqueKey::remote("order", 99));

        let conflicts = offline(&node, &local);

        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].cause.is_some());
    }

    #[test]
    fn failed_line_marks_order() {
        let local = InMemoryStore::local();
        let graph = order_graph();
        let local_key = local.insert("line", 500, Version::new(0));
        graph.line2.put_mapping(Some(
            MappingEntry::new(
                local_key,
                UniqueKey::remote("line", 31),
                Version::new(0),
                Version::new(9),
            )
            .unwrap(),
        ));

        let conflicts = offline(&graph.order, &local);

        assert_eq!(conflicts.len(), 2);
        assert!(conflicts[0].dependent.as_ref().is_some_and(|n| n.same(&graph.line2)));
        assert!(conflicts[1].is_dependent_failure());
        assert!(conflicts[1].dependent.as_ref().is_some_and(|n| n.same(&graph.order)));
        // The order itself was never saved; its siblings were.
        assert_eq!(graph.order.key_type(), KeyType::Remote);
        assert_eq!(graph.customer.key_type(), KeyType::Local);
        assert_eq!(graph.line1.key_type(), KeyType::Local);
    }

    #[test]
    fn visit_rejects_local_node() {
        let local = InMemoryStore::local();
        let mut visitor = OffliningVisitor::new(&local);
        let result = visitor.visit(&Entity::local("order", 1, 0));
        assert!(matches!(result, Err(NodeError::Abort(_))));
    }

    #[test]
    fn unkeyed_node_aborts_run() {
        let local = InMemoryStore::local();
        let root = Entity::remote("order", 1, 1);
        root.push_child("lines", &Entity::unkeyed("line"));

        let result = GraphWalker::new(OffliningVisitor::new(&local)).run(&root);
        assert!(result.is_err());
        assert_eq!(local.save_count(), 0);
    }

    #[test]
    fn entity_type_survives_rekey() {
        let local = InMemoryStore::local();
        let node = Entity::remote("customer", 4, 1);
        offline(&node, &local);
        assert_eq!(node.entity_type(), "customer");
        assert_eq!(node.unique_key().unwrap().entity_type(), "customer");
    }
}
