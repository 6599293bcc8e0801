//! Local/remote identity mapping.

use crate::error::{WalkError, WalkResult};
use crate::types::{KeySpace, UniqueKey, Version};
use serde::{Deserialize, Serialize};

/// Durable record correlating an object's local and remote identities.
///
/// Holds the version baselines last known to agree between the two stores.
/// Once created, an entry always carries a complete local/remote key pair;
/// only key values and baselines change afterwards, never the space tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMappingEntry")]
pub struct MappingEntry {
    local_key: UniqueKey,
    remote_key: UniqueKey,
    local_base: Version,
    remote_base: Version,
}

/// Wire shape of a [`MappingEntry`], validated on the way in.
#[derive(Deserialize)]
struct RawMappingEntry {
    local_key: UniqueKey,
    remote_key: UniqueKey,
    local_base: Version,
    remote_base: Version,
}

impl TryFrom<RawMappingEntry> for MappingEntry {
    type Error = WalkError;

    fn try_from(raw: RawMappingEntry) -> WalkResult<Self> {
        MappingEntry::new(raw.local_key, raw.remote_key, raw.local_base, raw.remote_base)
    }
}

impl MappingEntry {
    /// Creates a new entry.
    ///
    /// Fails if `local_key` is not in the local space or `remote_key` is not
    /// in the remote space.
    pub fn new(
        local_key: UniqueKey,
        remote_key: UniqueKey,
        local_base: Version,
        remote_base: Version,
    ) -> WalkResult<Self> {
        if local_key.space() != KeySpace::Local {
            return Err(WalkError::InvalidMapping {
                message: format!("local side {local_key} is not a local key"),
            });
        }
        if remote_key.space() != KeySpace::Remote {
            return Err(WalkError::InvalidMapping {
                message: format!("remote side {remote_key} is not a remote key"),
            });
        }
        Ok(Self {
            local_key,
            remote_key,
            local_base,
            remote_base,
        })
    }

    /// Returns the local key.
    #[must_use]
    pub fn local_key(&self) -> &UniqueKey {
        &self.local_key
    }

    /// Returns the remote key.
    #[must_use]
    pub fn remote_key(&self) -> &UniqueKey {
        &self.remote_key
    }

    /// Returns the key for the given space.
    #[must_use]
    pub fn key_in(&self, space: KeySpace) -> &UniqueKey {
        match space {
            KeySpace::Local => &self.local_key,
            KeySpace::Remote => &self.remote_key,
        }
    }

    /// Returns the local version baseline.
    #[must_use]
    pub const fn local_base(&self) -> Version {
        self.local_base
    }

    /// Returns the remote version baseline.
    #[must_use]
    pub const fn remote_base(&self) -> Version {
        self.remote_base
    }

    /// Returns the baseline for the given space.
    #[must_use]
    pub const fn base_in(&self, space: KeySpace) -> Version {
        match space {
            KeySpace::Local => self.local_base,
            KeySpace::Remote => self.remote_base,
        }
    }

    /// Moves both baselines forward after a successful save.
    pub fn advance(&mut self, local_base: Version, remote_base: Version) {
        self.local_base = local_base;
        self.remote_base = remote_base;
    }

    /// Replaces the local key's id.
    pub fn set_local_id(&mut self, id: u64) {
        self.local_key = self.local_key.with_id(id);
    }

    /// Replaces the remote key's id.
    pub fn set_remote_id(&mut self, id: u64) {
        self.remote_key = self.remote_key.with_id(id);
    }
}
