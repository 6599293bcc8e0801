//! Integration tests for offline/online sync sessions.

use offliner_core::{
    ConflictPhase, ConflictReport, ConflictResolution, Identified, KeyType, Mapped, MappingEntry,
    Typed, UniqueKey, Version, Versioned,
};
use offliner_sync::{InMemoryStore, NodeStore, StoreError, SyncConfig, SyncSession};
use offliner_testkit::{order_graph, snapshot_graph, Entity, OrderGraph};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Session = SyncSession<Arc<InMemoryStore>, Arc<InMemoryStore>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn make_session(config: SyncConfig) -> Session {
    init_tracing();
    SyncSession::new(
        config,
        Arc::new(InMemoryStore::local()),
        Arc::new(InMemoryStore::remote()),
    )
}

/// Seeds the remote rows backing [`order_graph`].
fn seed_orders(remote: &InMemoryStore) {
    remote.insert("customer", 10, Version::new(3));
    remote.insert("order", 20, Version::new(5));
    remote.insert("line", 30, Version::new(1));
    remote.insert("line", 31, Version::new(2));
}

fn offlined_orders(session: &Session) -> OrderGraph {
    seed_orders(session.remote());
    let graph = order_graph();
    let outcome = session.offline(&graph.order).unwrap();
    assert!(outcome.is_clean());
    graph
}

#[test]
fn single_node_is_processed_alone() {
    let session = make_session(SyncConfig::default());
    let root = Entity::remote("order", 20, 5);

    let outcome = session.offline(&root).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.pre_visited, 1);
    assert_eq!(outcome.stats.visited, 1);
    assert_eq!(session.local().len(), 1);
}

#[test]
fn two_cycle_visits_each_node_once() {
    let session = make_session(SyncConfig::default());
    let order = Entity::remote("order", 20, 5);
    let line = Entity::remote("line", 30, 1);
    order.push_child("lines", &line);
    line.set_link("order", Some(&order));

    let outcome = session.offline(&order).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.pre_visited, 2);
    assert_eq!(outcome.stats.visited, 2);
    assert_eq!(session.local().save_count(), 2);
    assert_eq!(order.key_type(), KeyType::Local);
    assert_eq!(line.key_type(), KeyType::Local);
}

#[test]
fn new_remote_object_gets_mapping() {
    let session = make_session(SyncConfig::default());
    let order = Entity::remote("order", 20, 5);

    session.offline(&order).unwrap();

    let entry = order.mapping_entry().unwrap();
    assert_eq!(entry.remote_base(), Version::new(5));
    assert_eq!(entry.remote_key(), &UniqueKey::remote("order", 20));
    assert_eq!(order.unique_key(), Some(entry.local_key().clone()));
    assert_eq!(
        session.local().version_of(entry.local_key()),
        Some(order.version())
    );
}

#[test]
fn regressed_remote_version_is_offline_conflict() {
    let session = make_session(SyncConfig::default());
    let local_key = session.local().insert("order", 1, Version::new(2));
    let order = Entity::remote("order", 20, 3);
    order.set_mapping_entry(
        MappingEntry::new(
            local_key,
            UniqueKey::remote("order", 20),
            Version::new(2),
            Version::new(5),
        )
        .unwrap(),
    );

    let outcome = session.offline(&order).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].phase, ConflictPhase::Offline);
    assert!(outcome.conflicts[0].dependent.as_ref().is_some_and(|n| n.same(&order)));
    assert_eq!(session.local().save_count(), 0);
    assert_eq!(order.key_type(), KeyType::Remote);
}

#[test]
fn failing_child_fails_parent_only() {
    let session = make_session(SyncConfig::default());
    let parent = Entity::remote("order", 20, 5);
    let ok_child = Entity::remote("line", 30, 1);
    let bad_child = Entity::remote("line", 31, 1);
    parent.push_child("lines", &ok_child);
    parent.push_child("lines", &bad_child);
    let local_key = session.local().insert("line", 7, Version::new(0));
    bad_child.set_mapping_entry(
        MappingEntry::new(
            local_key,
            UniqueKey::remote("line", 31),
            Version::new(0),
            Version::new(4),
        )
        .unwrap(),
    );

    let outcome = session.offline(&parent).unwrap();

    assert_eq!(outcome.conflicts.len(), 2);
    let marked = &outcome.conflicts[1];
    assert!(marked.is_dependent_failure());
    assert_eq!(marked.dependent_key(), Some(UniqueKey::remote("order", 20)));
    assert_eq!(marked.offending_key(), Some(UniqueKey::remote("line", 31)));
    assert_eq!(ok_child.key_type(), KeyType::Local);
    assert_eq!(parent.key_type(), KeyType::Remote);
    assert_eq!(outcome.stats.dependent_failures, 1);
}

#[test]
fn offlining_twice_saves_nothing_new() {
    let session = make_session(SyncConfig::default());
    let graph = offlined_orders(&session);
    let saves = session.local().save_count();

    let outcome = session.offline(&graph.order).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(session.local().save_count(), saves);
    assert_eq!(outcome.stats.visited, 0);
}

#[test]
fn reoffline_after_sync_only_rekeys() {
    let session = make_session(SyncConfig::default());
    let graph = offlined_orders(&session);
    session.synchronize(&graph.order).unwrap();
    let saves = session.local().save_count();

    let outcome = session.offline(&graph.order).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.stats.visited, 4);
    assert_eq!(session.local().save_count(), saves);
    for entity in graph.all() {
        assert_eq!(entity.key_type(), KeyType::Local);
    }
}

#[test]
fn round_trip_restores_remote_identity() {
    let session = make_session(SyncConfig::default());
    seed_orders(session.remote());
    let graph = order_graph();
    let before = snapshot_graph(&graph.order);

    session.offline(&graph.order).unwrap();
    let outcome = session.synchronize(&graph.order).unwrap();

    assert!(outcome.is_clean());
    let after = snapshot_graph(&graph.order);
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.key, a.key);
        assert_eq!(b.version, a.version);
    }
    assert_eq!(session.remote().save_count(), 0);
}

#[test]
fn local_edits_reach_remote() {
    let session = make_session(SyncConfig::default());
    let graph = offlined_orders(&session);
    NodeStore::<Entity>::save_or_update(session.local(), &graph.line1).unwrap();
    NodeStore::<Entity>::save_or_update(session.local(), &graph.line1).unwrap();

    let outcome = session.synchronize(&graph.order).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(session.remote().save_count(), 1);
    assert_eq!(
        session.remote().version_of(&UniqueKey::remote("line", 30)),
        Some(Version::new(2))
    );
    let entry = graph.line1.mapping_entry().unwrap();
    assert_eq!(entry.local_base(), Version::new(2));
    assert_eq!(entry.remote_base(), Version::new(2));
}

#[test]
fn stale_push_is_reported_and_forced() {
    let session = make_session(SyncConfig::default());
    let graph = offlined_orders(&session);
    NodeStore::<Entity>::save_or_update(session.local(), &graph.order).unwrap();
    session.remote().insert("order", 20, Version::new(9));

    let mut outcome = session.synchronize(&graph.order).unwrap();
    assert_eq!(outcome.conflicts.len(), 1);
    let mut conflict = outcome.conflicts.remove(0);
    assert!(conflict
        .cause
        .as_ref()
        .and_then(|c| c.downcast_ref::<StoreError>())
        .is_some_and(StoreError::is_version_conflict));

    let report = conflict.report();
    let decoded = ConflictReport::decode(&report.encode().unwrap()).unwrap();
    assert_eq!(decoded, report);
    assert_eq!(decoded.phase, ConflictPhase::Synchronize);

    let forced = session
        .resolve(&graph.order, &mut conflict, ConflictResolution::ForceOverwrite)
        .unwrap()
        .unwrap();

    assert!(forced.is_clean());
    assert_eq!(conflict.resolution, Some(ConflictResolution::ForceOverwrite));
    assert_eq!(graph.order.unique_key(), Some(UniqueKey::remote("order", 20)));
    assert_eq!(graph.order.version(), Version::new(10));
    assert_eq!(conflict.report().resolution, Some(ConflictResolution::ForceOverwrite));
}

#[test]
fn offline_conflict_can_be_forced() {
    let session = make_session(SyncConfig::default());
    session.remote().insert("order", 20, Version::new(5));
    let local_key = session.local().insert("order", 1, Version::new(2));
    let order = Entity::remote("order", 20, 3);
    order.set_mapping_entry(
        MappingEntry::new(
            local_key.clone(),
            UniqueKey::remote("order", 20),
            Version::new(2),
            Version::new(5),
        )
        .unwrap(),
    );
    let mut conflict = session.offline(&order).unwrap().conflicts.remove(0);

    session
        .resolve(&order, &mut conflict, ConflictResolution::ForceOverwrite)
        .unwrap();

    assert!(conflict.is_resolved());
    let outcome = session.offline(&order).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(order.unique_key(), Some(local_key));
}

#[test]
fn policy_settles_every_own_failure() {
    let config = SyncConfig::new().with_conflict_policy(ConflictResolution::ForceOverwrite);
    let session = make_session(config);
    let graph = offlined_orders(&session);
    for entity in [&graph.customer, &graph.line2] {
        NodeStore::<Entity>::save_or_update(session.local(), entity).unwrap();
    }
    session.remote().insert("customer", 10, Version::new(4));
    session.remote().insert("line", 31, Version::new(3));

    let outcome = session.synchronize(&graph.order).unwrap();

    // The customer and line fail on their own and get forced. The order only
    // failed because of the customer and goes through in the forced run.
    assert!(outcome.is_clean());
    assert_eq!(outcome.resolved.len(), 2);
    for entity in graph.all() {
        assert_eq!(entity.key_type(), KeyType::Remote);
    }
    assert_eq!(session.stats().forced_runs, 2);
}

#[test]
fn forcing_a_child_clears_its_parent() {
    let config = SyncConfig::new().with_conflict_policy(ConflictResolution::ForceOverwrite);
    let session = make_session(config);
    let graph = offlined_orders(&session);
    NodeStore::<Entity>::save_or_update(session.local(), &graph.customer).unwrap();
    session.remote().insert("customer", 10, Version::new(4));

    let outcome = session.synchronize(&graph.order).unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.resolved.len(), 1);
    assert!(outcome.resolved[0]
        .dependent
        .as_ref()
        .is_some_and(|n| n.same(&graph.customer)));
    assert_eq!(graph.order.unique_key(), Some(UniqueKey::remote("order", 20)));
    assert_eq!(graph.order.version(), Version::new(5));
    assert_eq!(session.stats().forced_runs, 1);
}

#[test]
fn conflicts_surfaced_by_forced_run_are_reported() {
    let config = SyncConfig::new().with_conflict_policy(ConflictResolution::ForceOverwrite);
    let session = make_session(config);
    let graph = offlined_orders(&session);
    for entity in [&graph.customer, &graph.order] {
        NodeStore::<Entity>::save_or_update(session.local(), entity).unwrap();
    }
    session.remote().insert("customer", 10, Version::new(4));
    session
        .remote()
        .reject_saves_for(UniqueKey::remote("order", 20), "archived");

    let outcome = session.synchronize(&graph.order).unwrap();

    // Forcing the customer lets the order reach the remote store, where its
    // own save is refused, and forcing it is refused too.
    assert_eq!(outcome.resolved.len(), 1);
    assert_eq!(outcome.conflicts.len(), 1);
    let conflict = &outcome.conflicts[0];
    assert_eq!(conflict.phase, ConflictPhase::Force);
    assert!(!conflict.is_dependent_failure());
    assert!(conflict.dependent.as_ref().is_some_and(|n| n.same(&graph.order)));
    assert_eq!(
        conflict.cause.as_ref().and_then(|c| c.downcast_ref::<StoreError>()),
        Some(&StoreError::Rejected {
            key: UniqueKey::remote("order", 20),
            reason: "archived".into(),
        })
    );
    assert_eq!(graph.customer.key_type(), KeyType::Remote);
    assert_eq!(graph.order.key_type(), KeyType::Local);
    assert_eq!(session.stats().forced_runs, 2);
}

#[test]
fn unavailable_remote_turns_into_conflicts() {
    let session = make_session(SyncConfig::default());
    let graph = offlined_orders(&session);
    for entity in graph.all() {
        NodeStore::<Entity>::save_or_update(session.local(), entity).unwrap();
    }
    session.remote().set_unavailable(true);

    let outcome = session.synchronize(&graph.order).unwrap();

    // Customer and both lines fail on their own, the order through its
    // first failing child.
    assert_eq!(outcome.conflicts.len(), 4);
    assert!(outcome
        .conflicts
        .iter()
        .all(|c| c.cause.is_some() || c.is_dependent_failure()));
    for entity in graph.all() {
        assert_eq!(entity.key_type(), KeyType::Local);
    }

    session.remote().set_unavailable(false);
    let outcome = session.synchronize(&graph.order).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(session.remote().save_count(), 4);
}

#[test]
fn sessions_share_stores_across_threads() {
    let local = Arc::new(InMemoryStore::local());
    let remote = Arc::new(InMemoryStore::remote());
    init_tracing();
    let session = SyncSession::new(
        SyncConfig::default(),
        Arc::clone(&local),
        Arc::clone(&remote),
    );

    std::thread::scope(|scope| {
        for id in 0..4u64 {
            let session = &session;
            scope.spawn(move || {
                let order = Entity::remote("order", 100 + id, 1);
                order.push_child("lines", &Entity::remote("line", 200 + id, 1));
                let outcome = session.offline(&order).unwrap();
                assert!(outcome.is_clean());
            });
        }
    });

    assert_eq!(local.len(), 8);
    assert_eq!(session.stats().runs, 4);
    assert_eq!(session.stats().nodes_processed, 8);
}
