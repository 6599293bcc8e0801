//! Sync sessions: running the visitors and settling their conflicts.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::forced::ForcedSynchronizingVisitor;
use crate::offline::OffliningVisitor;
use crate::store::NodeStore;
use crate::synchronize::ServerSynchronizingVisitor;
use offliner_core::{
    Conflict, ConflictPhase, ConflictResolution, GraphWalker, KeySpace, NodeVisitor, SyncNode,
    UniqueKey, WalkStats,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistics accumulated across the runs of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Walker runs completed, forced ones included.
    pub runs: u64,
    /// Nodes handed to `visit`.
    pub nodes_processed: u64,
    /// Conflicts reported by all runs.
    pub conflicts_raised: u64,
    /// Forced synchronization runs.
    pub forced_runs: u64,
    /// Last error that aborted a run.
    pub last_error: Option<String>,
}

/// Result of one session operation.
#[derive(Debug)]
pub struct SyncOutcome<N> {
    /// Operation that was run.
    pub phase: ConflictPhase,
    /// Conflicts that require manual resolution.
    pub conflicts: Vec<Conflict<N>>,
    /// Conflicts settled by the configured policy.
    pub resolved: Vec<Conflict<N>>,
    /// Walker counters for the run.
    pub stats: WalkStats,
    /// Wall time of the operation.
    pub duration: Duration,
}

impl<N> SyncOutcome<N> {
    /// Returns true if nothing is left to resolve.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Moves object graphs between a local and a remote store.
///
/// Every operation is one walker run with a fresh visitor, so a session
/// can be shared behind `&self`. Stores are independently durable per
/// save; an aborted run leaves already saved nodes in place.
pub struct SyncSession<L, R> {
    config: SyncConfig,
    local: L,
    remote: R,
    stats: RwLock<SyncStats>,
}

impl<L, R> SyncSession<L, R> {
    /// Creates a new session.
    pub fn new(config: SyncConfig, local: L, remote: R) -> Self {
        Self {
            config,
            local,
            remote,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the local store.
    pub fn local(&self) -> &L {
        &self.local
    }

    /// Gets the remote store.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Offlines everything reachable from `root` into the local store.
    pub fn offline<N>(&self, root: &N) -> SyncResult<SyncOutcome<N>>
    where
        N: SyncNode,
        L: NodeStore<N>,
    {
        self.run(ConflictPhase::Offline, OffliningVisitor::new(&self.local), root)
    }

    /// Pushes local changes reachable from `root` to the remote store.
    ///
    /// With a conflict policy configured, every conflict raised for a
    /// node's own failure is resolved right away and reported as resolved.
    /// Under `ForceOverwrite` the returned conflicts are those left by the
    /// last forced run, so dependent failures the forced runs cleared are
    /// dropped and conflicts they newly raised are kept.
    pub fn synchronize<N>(&self, root: &N) -> SyncResult<SyncOutcome<N>>
    where
        N: SyncNode,
        R: NodeStore<N>,
    {
        let start = Instant::now();
        let mut outcome = self.run(
            ConflictPhase::Synchronize,
            ServerSynchronizingVisitor::new(&self.remote),
            root,
        )?;
        let Some(policy) = self.config.conflict_policy else {
            return Ok(outcome);
        };

        // A forced run walks the whole graph again, so its conflicts replace
        // the pending list. Each node is settled at most once.
        let mut pending = std::mem::take(&mut outcome.conflicts);
        let mut attempted = HashSet::new();
        while let Some(index) = pending.iter().position(|c| {
            c.dependent.is_some()
                && !c.is_dependent_failure()
                && !attempted.contains(&c.dependent_key())
        }) {
            let mut conflict = pending.remove(index);
            attempted.insert(conflict.dependent_key());
            match self.resolve(root, &mut conflict, policy) {
                Ok(Some(forced)) => {
                    pending = forced.conflicts;
                    if conflict.is_resolved() {
                        outcome.resolved.push(conflict);
                    }
                }
                Ok(None) => outcome.resolved.push(conflict),
                Err(SyncError::Unforceable(reason)) => {
                    debug!(%reason, "conflict left for manual resolution");
                    pending.insert(index, conflict);
                }
                Err(err) => return Err(err),
            }
        }
        outcome.conflicts = pending;
        outcome.duration = start.elapsed();

        info!(
            ?policy,
            resolved = outcome.resolved.len(),
            unresolved = outcome.conflicts.len(),
            "applied conflict policy"
        );
        Ok(outcome)
    }

    /// Synchronizes `root`, force-pushing the node whose local key is
    /// `pinned`.
    pub fn force<N>(&self, root: &N, pinned: &UniqueKey) -> SyncResult<SyncOutcome<N>>
    where
        N: SyncNode,
        R: NodeStore<N>,
    {
        let outcome = self.run(
            ConflictPhase::Force,
            ForcedSynchronizingVisitor::new(&self.remote, pinned.clone()),
            root,
        )?;
        self.stats.write().forced_runs += 1;
        Ok(outcome)
    }

    /// Applies `resolution` to `conflict`.
    ///
    /// `Accept` and `Skip` only record the decision. `ForceOverwrite` runs
    /// a forced synchronization over `root` pinned to the conflict's node
    /// and returns its outcome; the resolution is recorded only if the
    /// pinned node went through.
    pub fn resolve<N>(
        &self,
        root: &N,
        conflict: &mut Conflict<N>,
        resolution: ConflictResolution,
    ) -> SyncResult<Option<SyncOutcome<N>>>
    where
        N: SyncNode,
        R: NodeStore<N>,
    {
        match resolution {
            ConflictResolution::Accept | ConflictResolution::Skip => {
                info!(dependent = ?conflict.dependent_key(), ?resolution, "conflict resolved");
                conflict.resolve(resolution);
                Ok(None)
            }
            ConflictResolution::ForceOverwrite => {
                let pinned = local_identity(conflict)?;
                let outcome = self.force(root, &pinned)?;
                if outcome
                    .conflicts
                    .iter()
                    .any(|c| c.phase == ConflictPhase::Force)
                {
                    warn!(%pinned, "forced overwrite did not go through");
                } else {
                    info!(%pinned, "conflict resolved by forced overwrite");
                    conflict.resolve(resolution);
                }
                Ok(Some(outcome))
            }
        }
    }

    fn run<N, V>(&self, phase: ConflictPhase, visitor: V, root: &N) -> SyncResult<SyncOutcome<N>>
    where
        N: SyncNode,
        V: NodeVisitor<N>,
    {
        let start = Instant::now();
        let mut walker = GraphWalker::with_config(visitor, self.config.walker.clone());
        let conflicts = match walker.run(root) {
            Ok(conflicts) => conflicts,
            Err(err) => {
                warn!(?phase, %err, "run aborted");
                self.stats.write().last_error = Some(err.to_string());
                return Err(err.into());
            }
        };

        {
            let mut stats = self.stats.write();
            stats.runs += 1;
            stats.nodes_processed += walker.stats().visited;
            stats.conflicts_raised += conflicts.len() as u64;
            stats.last_error = None;
        }
        for conflict in &conflicts {
            warn!(
                ?phase,
                dependent = ?conflict.dependent_key(),
                offending = ?conflict.offending_key(),
                cause = ?conflict.cause.as_ref().map(|c| c.to_string()),
                "conflict"
            );
        }

        Ok(SyncOutcome {
            phase,
            conflicts,
            resolved: Vec::new(),
            stats: walker.stats().clone(),
            duration: start.elapsed(),
        })
    }
}

/// Local identity a forced run should pin for `conflict`.
fn local_identity<N: SyncNode>(conflict: &Conflict<N>) -> SyncResult<UniqueKey> {
    let node = conflict
        .dependent
        .as_ref()
        .ok_or_else(|| SyncError::Unforceable("conflict names no node".into()))?;
    if let Some(entry) = node.mapping_entry() {
        return Ok(entry.local_key().clone());
    }
    match node.unique_key() {
        Some(key) if key.space() == KeySpace::Local => Ok(key),
        Some(key) => Err(SyncError::Unforceable(format!("{key} has never been offlined"))),
        None => Err(SyncError::Unforceable(format!(
            "{} node has no key",
            node.entity_type()
        ))),
    }
}
