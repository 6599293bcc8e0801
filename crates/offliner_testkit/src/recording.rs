//! A scriptable visitor that records every call it receives.

use offliner_core::{
    Conflict, ConflictPhase, Identified, NodeState, NodeVisitor, UniqueKey, VisitResult,
    WalkResult,
};
use std::collections::{HashMap, HashSet};

/// One call received by a [`RecordingVisitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitorCall {
    /// `pre_visit` on the node.
    PreVisit(UniqueKey),
    /// `visit` on the node.
    Visit(UniqueKey),
    /// `mark_error` on the node because of the child.
    MarkError {
        /// Node being error-marked.
        node: UniqueKey,
        /// Child passed as the failing one.
        child: UniqueKey,
    },
}

/// Visitor driven by a script of per-key outcomes.
///
/// Keys not mentioned in the script are processed normally.
#[derive(Debug, Default)]
pub struct RecordingVisitor {
    verdicts: HashMap<UniqueKey, NodeState>,
    failing: HashSet<UniqueKey>,
    calls: Vec<VisitorCall>,
}

impl RecordingVisitor {
    /// Creates a visitor with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `pre_visit` return `verdict` for `key`.
    #[must_use]
    pub fn with_verdict(mut self, key: UniqueKey, verdict: NodeState) -> Self {
        self.verdicts.insert(key, verdict);
        self
    }

    /// Makes `visit` raise a conflict for `key`.
    #[must_use]
    pub fn failing(mut self, key: UniqueKey) -> Self {
        self.failing.insert(key);
        self
    }

    /// All calls in the order received.
    pub fn calls(&self) -> &[VisitorCall] {
        &self.calls
    }

    /// How many times `pre_visit` saw `key`.
    pub fn pre_visits_of(&self, key: &UniqueKey) -> usize {
        self.count(|call| matches!(call, VisitorCall::PreVisit(k) if k == key))
    }

    /// How many times `visit` saw `key`.
    pub fn visits_of(&self, key: &UniqueKey) -> usize {
        self.count(|call| matches!(call, VisitorCall::Visit(k) if k == key))
    }

    /// How many times `key` was error-marked.
    pub fn marks_of(&self, key: &UniqueKey) -> usize {
        self.count(|call| matches!(call, VisitorCall::MarkError { node, .. } if node == key))
    }

    fn count(&self, predicate: impl Fn(&VisitorCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

fn key_of<N: Identified>(node: &N) -> UniqueKey {
    // The walker never hands over unkeyed nodes.
    node.unique_key()
        .unwrap_or_else(|| UniqueKey::local(node.entity_type(), 0))
}

impl<N> NodeVisitor<N> for RecordingVisitor
where
    N: Identified + Clone,
{
    fn pre_visit(&mut self, node: &N) -> WalkResult<NodeState> {
        let key = key_of(node);
        let verdict = self
            .verdicts
            .get(&key)
            .copied()
            .unwrap_or(NodeState::Unseen);
        self.calls.push(VisitorCall::PreVisit(key));
        Ok(verdict)
    }

    fn visit(&mut self, node: &N) -> VisitResult<N> {
        let key = key_of(node);
        let fails = self.failing.contains(&key);
        self.calls.push(VisitorCall::Visit(key));
        if fails {
            return Err(Conflict::new(ConflictPhase::Offline)
                .with_dependent(node.clone())
                .into());
        }
        Ok(())
    }

    fn mark_error(&mut self, node: &N, failing_child: &N) -> Conflict<N> {
        self.calls.push(VisitorCall::MarkError {
            node: key_of(node),
            child: key_of(failing_child),
        });
        Conflict::dependent_failure(ConflictPhase::Offline, node.clone(), failing_child.clone())
    }
}
