//! Depth-first, cycle-safe object-graph walker.

use crate::capability::{Identified, Linked};
use crate::config::WalkerConfig;
use crate::conflict::Conflict;
use crate::error::{WalkError, WalkResult};
use crate::state::NodeState;
use crate::types::UniqueKey;
use crate::visitor::{NodeError, NodeVisitor};
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Counters for the last walker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Nodes handed to `pre_visit`.
    pub pre_visited: u64,
    /// Nodes handed to `visit`.
    pub visited: u64,
    /// Nodes settled by `pre_visit` without being visited.
    pub pruned: u64,
    /// Nodes whose own `visit` raised a conflict.
    pub failed: u64,
    /// Nodes error-marked because of a failing child.
    pub dependent_failures: u64,
}

/// Walks an object graph and drives one visitor over every reachable node.
///
/// The state map is owned by the walker and cleared at the start of every
/// run. `run` takes `&mut self`, so one walker can never run twice at once.
///
/// # Example
///
/// ```rust,ignore
/// let mut walker = GraphWalker::new(OffliningVisitor::new(&local_store));
/// let conflicts = walker.run(&root)?;
/// ```
pub struct GraphWalker<N, V> {
    visitor: V,
    config: WalkerConfig,
    states: HashMap<UniqueKey, NodeState>,
    conflicts: Vec<Conflict<N>>,
    stats: WalkStats,
}

impl<N, V> GraphWalker<N, V>
where
    N: Clone + Linked + Identified,
    V: NodeVisitor<N>,
{
    /// Creates a walker with default configuration.
    pub fn new(visitor: V) -> Self {
        Self::with_config(visitor, WalkerConfig::default())
    }

    /// Creates a walker with the given configuration.
    pub fn with_config(visitor: V, config: WalkerConfig) -> Self {
        Self {
            visitor,
            config,
            states: HashMap::new(),
            conflicts: Vec::new(),
            stats: WalkStats::default(),
        }
    }

    /// Walks everything reachable from `root` and returns the conflicts.
    ///
    /// Conflicts never stop the run; the rest of the graph is still
    /// processed. Only precondition and invariant violations abort it.
    /// There is no rollback: nodes visited before an abort stay mutated.
    pub fn run(&mut self, root: &N) -> WalkResult<Vec<Conflict<N>>> {
        self.states.clear();
        self.conflicts.clear();
        self.stats = WalkStats::default();

        let root_state = self.walk(root, 1)?;

        info!(
            root = ?root.unique_key(),
            state = ?root_state,
            pre_visited = self.stats.pre_visited,
            visited = self.stats.visited,
            pruned = self.stats.pruned,
            conflicts = self.conflicts.len(),
            "graph walk finished"
        );

        Ok(std::mem::take(&mut self.conflicts))
    }

    /// State of a node after the last run. Unknown keys are `Unseen`.
    pub fn state_of(&self, key: &UniqueKey) -> NodeState {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// Counters for the last run.
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    /// Gets the configuration.
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Gets the visitor.
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    /// Gets the visitor mutably.
    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    /// Consumes the walker and returns its visitor.
    pub fn into_visitor(self) -> V {
        self.visitor
    }

    fn walk(&mut self, node: &N, depth: usize) -> WalkResult<NodeState> {
        if depth > self.config.max_depth {
            return Err(WalkError::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }

        let key = node.unique_key().ok_or_else(|| WalkError::Unkeyed {
            entity_type: node.entity_type(),
        })?;

        let state = self.state_of(&key);
        if state != NodeState::Unseen {
            trace!(%key, ?state, "already reached");
            return Ok(state);
        }

        self.transition(&key, NodeState::Pending)?;
        self.stats.pre_visited += 1;

        let verdict = self.visitor.pre_visit(node)?;
        if verdict != NodeState::Unseen {
            debug!(%key, ?verdict, "settled by pre-visit");
            self.transition(&key, verdict)?;
            self.stats.pruned += 1;
            return self.settled(&key);
        }

        let mut failing_child = None;
        for child in node.children() {
            let child_state = self.walk(&child, depth + 1)?;
            if child_state == NodeState::Error && failing_child.is_none() {
                failing_child = Some(child);
            }
        }

        let outcome = match failing_child {
            None => {
                self.stats.visited += 1;
                match self.visitor.visit(node) {
                    Ok(()) => NodeState::Processed,
                    Err(NodeError::Conflict(conflict)) => {
                        debug!(%key, phase = ?conflict.phase, "visit raised conflict");
                        self.stats.failed += 1;
                        self.conflicts.push(*conflict);
                        NodeState::Error
                    }
                    Err(NodeError::Abort(error)) => return Err(error),
                }
            }
            Some(child) => {
                debug!(%key, child = ?child.unique_key(), "child failed");
                self.stats.dependent_failures += 1;
                let conflict = self.visitor.mark_error(node, &child);
                self.conflicts.push(conflict);
                NodeState::Error
            }
        };

        self.transition(&key, outcome)?;

        // A visit may move the node into another key space; remember the
        // outcome under the new key so later paths recognise the node.
        if let Some(current) = node.unique_key() {
            if current != key {
                trace!(from = %key, to = %current, "node rekeyed");
                self.states.entry(current).or_insert(outcome);
            }
        }

        self.settled(&key)
    }

    fn transition(&mut self, key: &UniqueKey, next: NodeState) -> WalkResult<()> {
        let current = self.state_of(key);
        if !current.can_transition_to(next) {
            return Err(WalkError::IllegalTransition {
                key: key.clone(),
                from: current,
                to: next,
            });
        }
        self.states.insert(key.clone(), next);
        Ok(())
    }

    fn settled(&self, key: &UniqueKey) -> WalkResult<NodeState> {
        match self.state_of(key) {
            NodeState::Pending | NodeState::Unseen => Err(WalkError::invariant(format!(
                "{key} left unsettled after processing"
            ))),
            state => Ok(state),
        }
    }
}
