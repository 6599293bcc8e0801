//! Moving a node from one identity space into the other.
//!
//! Offlining and synchronizing are the same algorithm pointed in opposite
//! directions: the target store decides the direction, the node's current
//! key must come from the other space.

use crate::error::SyncError;
use crate::store::{NodeStore, StoredHead};
use offliner_core::{
    Conflict, ConflictPhase, KeySpace, KeyType, MappingEntry, NodeError, NodeState, SyncNode,
    Typed, UniqueKey, VisitResult, Version, WalkError, WalkResult,
};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Settles nodes that already live in the target space.
///
/// Nodes keyed in `source` need processing; nodes keyed in the other
/// space were moved earlier and count as processed. An unkeyed node is a
/// precondition violation.
pub(crate) fn classify<N: Typed>(node: &N, source: KeySpace) -> WalkResult<NodeState> {
    match (node.key_type(), source) {
        (KeyType::Null, _) => Err(WalkError::precondition(
            node.entity_type(),
            "node reached a sync visitor without a key",
        )),
        (KeyType::Local, KeySpace::Local) | (KeyType::Remote, KeySpace::Remote) => {
            Ok(NodeState::Unseen)
        }
        _ => Ok(NodeState::Processed),
    }
}

/// Moves `node` into the space of `store`.
pub(crate) fn migrate<N, S>(store: &S, phase: ConflictPhase, node: &N) -> VisitResult<N>
where
    N: SyncNode,
    S: NodeStore<N>,
{
    let target = store.space();
    let source = target.opposite();
    let key = source_key(node, source)?;
    let current = node.version();

    let Some(mut entry) = node.mapping_entry() else {
        node.clear_key();
        let head = save(store, phase, node, &key, current)?;
        let entry = new_entry(target, &head, &key, current)?;
        debug!(from = %key, to = %head.key, ?phase, "mapped new object");
        node.set_mapping_entry(entry);
        return Ok(());
    };

    check_mapping(&entry, source, &key, phase, node)?;
    let target_key = entry.key_in(target).clone();
    let target_base = entry.base_in(target);
    let baseline = entry.base_in(source);

    match current.cmp(&baseline) {
        Ordering::Greater => {
            node.set_key(target_key);
            node.set_version(target_base);
            let head = save(store, phase, node, &key, current)?;
            let (local, remote) = by_space(target, head.version, current);
            entry.advance(local, remote);
            debug!(from = %key, to = %head.key, %baseline, %current, "pushed changed object");
            node.set_mapping_entry(entry);
        }
        Ordering::Equal => {
            debug!(from = %key, to = %target_key, "object unchanged, rekeyed only");
            node.set_key(target_key);
            node.set_version(target_base);
        }
        Ordering::Less => {
            warn!(%key, %baseline, %current, ?phase, "version regressed below baseline");
            return Err(Conflict::new(phase).with_dependent(node.clone()).into());
        }
    }
    Ok(())
}

/// Returns the node's key, which must be in `source`.
pub(crate) fn source_key<N: SyncNode>(node: &N, source: KeySpace) -> WalkResult<UniqueKey> {
    let key = node.unique_key().ok_or_else(|| WalkError::Unkeyed {
        entity_type: node.entity_type(),
    })?;
    if key.space() != source {
        return Err(WalkError::precondition(
            node.entity_type(),
            format!("{key} is not a {source} key"),
        ));
    }
    Ok(key)
}

/// Reports a conflict if the entry does not describe `key`.
pub(crate) fn check_mapping<N: SyncNode>(
    entry: &MappingEntry,
    space: KeySpace,
    key: &UniqueKey,
    phase: ConflictPhase,
    node: &N,
) -> VisitResult<N> {
    let expected = entry.key_in(space);
    if expected == key {
        return Ok(());
    }
    warn!(%expected, found = %key, ?phase, "mapping entry does not match node");
    Err(Conflict::new(phase)
        .with_cause(SyncError::MappingMismatch {
            expected: expected.clone(),
            found: key.clone(),
        })
        .with_dependent(node.clone())
        .into())
}

/// Saves the node, restoring `key` and `version` if the store refuses.
pub(crate) fn save<N, S>(
    store: &S,
    phase: ConflictPhase,
    node: &N,
    key: &UniqueKey,
    version: Version,
) -> Result<StoredHead, NodeError<N>>
where
    N: SyncNode,
    S: NodeStore<N>,
{
    store.save_or_update(node).map_err(|err| {
        warn!(%key, %err, ?phase, "save failed");
        node.set_key(key.clone());
        node.set_version(version);
        Conflict::new(phase)
            .with_cause(err)
            .with_dependent(node.clone())
            .into()
    })
}

/// Orders a (target, source) version pair as (local, remote).
pub(crate) fn by_space(
    target: KeySpace,
    target_version: Version,
    source_version: Version,
) -> (Version, Version) {
    match target {
        KeySpace::Local => (target_version, source_version),
        KeySpace::Remote => (source_version, target_version),
    }
}

fn new_entry(
    target: KeySpace,
    head: &StoredHead,
    source_key: &UniqueKey,
    source_version: Version,
) -> WalkResult<MappingEntry> {
    let (local_base, remote_base) = by_space(target, head.version, source_version);
    let (local_key, remote_key) = match target {
        KeySpace::Local => (head.key.clone(), source_key.clone()),
        KeySpace::Remote => (source_key.clone(), head.key.clone()),
    };
    MappingEntry::new(local_key, remote_key, local_base, remote_base)
}
