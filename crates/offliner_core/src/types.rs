//! Identity and version types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity space a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeySpace {
    /// Keys minted by the local store.
    Local,
    /// Keys minted by the remote store.
    Remote,
}

impl KeySpace {
    /// Returns the other space.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            KeySpace::Local => KeySpace::Remote,
            KeySpace::Remote => KeySpace::Local,
        }
    }
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpace::Local => f.write_str("local"),
            KeySpace::Remote => f.write_str("remote"),
        }
    }
}

/// Unique identity of a domain object within one key space.
///
/// Two keys are equal only if entity type, space and id all match, so a
/// local and a remote object sharing a numeric id never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    entity_type: String,
    space: KeySpace,
    id: u64,
}

impl UniqueKey {
    /// Creates a new key.
    pub fn new(entity_type: impl Into<String>, space: KeySpace, id: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            space,
            id,
        }
    }

    /// Creates a key in the local space.
    pub fn local(entity_type: impl Into<String>, id: u64) -> Self {
        Self::new(entity_type, KeySpace::Local, id)
    }

    /// Creates a key in the remote space.
    pub fn remote(entity_type: impl Into<String>, id: u64) -> Self {
        Self::new(entity_type, KeySpace::Remote, id)
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Returns the key space.
    #[must_use]
    pub const fn space(&self) -> KeySpace {
        self.space
    }

    /// Returns the raw id within the space.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns a key with the same entity type and space but another id.
    #[must_use]
    pub fn with_id(&self, id: u64) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            space: self.space,
            id,
        }
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.entity_type, self.space, self.id)
    }
}

/// The identity-space tag currently carried by a domain object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// The object has no key.
    Null,
    /// The object carries a local key.
    Local,
    /// The object carries a remote key.
    Remote,
}

impl KeyType {
    /// Derives the key type from an optional key.
    #[must_use]
    pub fn of(key: Option<&UniqueKey>) -> Self {
        match key.map(UniqueKey::space) {
            None => KeyType::Null,
            Some(KeySpace::Local) => KeyType::Local,
            Some(KeySpace::Remote) => KeyType::Remote,
        }
    }
}

/// Optimistic-locking version of a stored object.
///
/// Versions only grow: every successful update bumps the version by one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(pub u64);

impl Version {
    /// Version assigned to a freshly inserted object.
    pub const INITIAL: Version = Version(0);

    /// Creates a new version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next version, or `None` once the counter is exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
