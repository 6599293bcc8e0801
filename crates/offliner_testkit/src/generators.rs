//! Property-based test generators using proptest.
//!
//! Generates random directed graphs, cycles and shared sub-graphs
//! included, plus a random subset of nodes scripted to fail.

use crate::fixtures::Entity;
use offliner_core::UniqueKey;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Entity type used for generated nodes.
pub const GENERATED_TYPE: &str = "node";

/// Shape of a generated graph. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    /// Number of nodes.
    pub nodes: usize,
    /// Directed edges `(from, to)`, in link order.
    pub edges: Vec<(usize, usize)>,
    /// Nodes whose visit should fail.
    pub failing: BTreeSet<usize>,
}

impl GraphSpec {
    /// Builds the graph with remote keys `1..=nodes`, all at version 1.
    ///
    /// The first outgoing edge of a node becomes a single link named
    /// `first`; the rest go into the `rest` collection.
    pub fn build(&self) -> Vec<Entity> {
        let entities: Vec<Entity> = (0..self.nodes)
            .map(|i| Entity::remote(GENERATED_TYPE, i as u64 + 1, 1))
            .collect();
        let mut has_first = vec![false; self.nodes];
        for &(from, to) in &self.edges {
            if has_first[from] {
                entities[from].push_child("rest", &entities[to]);
            } else {
                entities[from].set_link("first", Some(&entities[to]));
                has_first[from] = true;
            }
        }
        entities
    }

    /// Key of node `index`.
    pub fn key(&self, index: usize) -> UniqueKey {
        UniqueKey::remote(GENERATED_TYPE, index as u64 + 1)
    }

    /// Indices reachable from the root.
    pub fn reachable(&self) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            stack.extend(
                self.edges
                    .iter()
                    .filter(|(from, _)| *from == node)
                    .map(|(_, to)| *to),
            );
        }
        seen
    }

    /// Direct successors of `index`.
    pub fn successors(&self, index: usize) -> Vec<usize> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == index)
            .map(|(_, to)| *to)
            .collect()
    }
}

/// Strategy for generating graphs with up to `max_nodes` nodes.
pub fn graph_strategy(max_nodes: usize) -> impl Strategy<Value = GraphSpec> {
    (1..=max_nodes.max(1)).prop_flat_map(|nodes| {
        (
            Just(nodes),
            prop::collection::vec((0..nodes, 0..nodes), 0..=nodes * 3),
            prop::collection::btree_set(0..nodes, 0..=nodes / 3),
        )
            .prop_map(|(nodes, edges, failing)| GraphSpec {
                nodes,
                edges,
                failing,
            })
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropTestConfig {
    /// Quick configuration for fast tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 256,
        }
    }

    /// Thorough configuration for CI.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
