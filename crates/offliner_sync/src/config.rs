//! Configuration for sync sessions.

use offliner_core::{ConflictResolution, WalkerConfig};

/// Configuration for a [`SyncSession`](crate::SyncSession).
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Configuration shared by every walker the session creates.
    pub walker: WalkerConfig,
    /// Resolution applied automatically to synchronize conflicts.
    /// `None` leaves every conflict for the caller.
    pub conflict_policy: Option<ConflictResolution>,
}

impl SyncConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the walker configuration.
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Sets the automatic conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictResolution) -> Self {
        self.conflict_policy = Some(policy);
        self
    }
}
