//! Configuration for the graph walker.

/// Default recursion limit for a single run.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// Configuration for a [`GraphWalker`](crate::GraphWalker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Deepest link chain the walker follows before aborting the run.
    pub max_depth: usize,
}

impl WalkerConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the recursion limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self::new()
    }
}
