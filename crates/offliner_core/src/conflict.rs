//! Conflict detection results and resolution markers.

use crate::capability::Identified;
use crate::error::ReportError;
use crate::types::UniqueKey;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// Underlying error that caused a conflict.
pub type ConflictCause = Arc<dyn Error + Send + Sync + 'static>;

/// The operation that produced a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictPhase {
    /// Moving remote objects into local storage.
    Offline,
    /// Pushing local changes back to remote storage.
    Synchronize,
    /// Forced overwrite of one node on the remote side.
    Force,
}

/// How a reported conflict was dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// The current state is accepted as is; nothing is written.
    Accept,
    /// The conflict is left alone for now.
    Skip,
    /// The node is pushed to the remote side regardless of versions.
    ForceOverwrite,
}

/// A node-level failure reported by a walker run.
///
/// Conflicts are terminal values: recording one never triggers more
/// traversal. `dependent` is the node that could not be processed;
/// `offending` is the descendant whose failure it inherited, if any.
#[derive(Debug, Clone)]
pub struct Conflict<N> {
    /// Operation that produced the conflict.
    pub phase: ConflictPhase,
    /// Error behind the conflict, if there was one.
    pub cause: Option<ConflictCause>,
    /// Node whose own failure triggered this conflict.
    pub offending: Option<N>,
    /// Node that ended in error.
    pub dependent: Option<N>,
    /// Resolution (if any).
    pub resolution: Option<ConflictResolution>,
}

impl<N> Conflict<N> {
    /// Creates an empty conflict for the given phase.
    pub fn new(phase: ConflictPhase) -> Self {
        Self {
            phase,
            cause: None,
            offending: None,
            dependent: None,
            resolution: None,
        }
    }

    /// Conflict for a node whose failure is inherited from `failing_child`.
    pub fn dependent_failure(phase: ConflictPhase, node: N, failing_child: N) -> Self {
        Self::new(phase)
            .with_dependent(node)
            .with_offending(failing_child)
    }

    /// Sets the cause.
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Sets the offending node.
    #[must_use]
    pub fn with_offending(mut self, node: N) -> Self {
        self.offending = Some(node);
        self
    }

    /// Sets the dependent node.
    #[must_use]
    pub fn with_dependent(mut self, node: N) -> Self {
        self.dependent = Some(node);
        self
    }

    /// Returns true if the conflict was inherited from a descendant.
    pub fn is_dependent_failure(&self) -> bool {
        self.offending.is_some() && self.dependent.is_some()
    }

    /// Resolves the conflict with the given resolution.
    pub fn resolve(&mut self, resolution: ConflictResolution) {
        self.resolution = Some(resolution);
    }

    /// Returns true if the conflict has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

impl<N: Identified> Conflict<N> {
    /// Key of the dependent node, if it has one.
    pub fn dependent_key(&self) -> Option<UniqueKey> {
        self.dependent.as_ref().and_then(Identified::unique_key)
    }

    /// Key of the offending node, if it has one.
    pub fn offending_key(&self) -> Option<UniqueKey> {
        self.offending.as_ref().and_then(Identified::unique_key)
    }

    /// Builds a node-free summary of this conflict.
    pub fn report(&self) -> ConflictReport {
        ConflictReport {
            phase: self.phase,
            cause: self.cause.as_ref().map(|c| c.to_string()),
            offending: self.offending_key(),
            dependent: self.dependent_key(),
            resolution: self.resolution,
        }
    }
}

/// Serializable summary of a conflict, detached from the domain graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Operation that produced the conflict.
    pub phase: ConflictPhase,
    /// Rendered cause, if any.
    pub cause: Option<String>,
    /// Key of the offending node.
    pub offending: Option<UniqueKey>,
    /// Key of the dependent node.
    pub dependent: Option<UniqueKey>,
    /// Resolution (if any).
    pub resolution: Option<ConflictResolution>,
}

impl ConflictReport {
    /// Encodes to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, ReportError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| ReportError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self, ReportError> {
        ciborium::from_reader(bytes).map_err(|e| ReportError::Decode(e.to_string()))
    }
}
