//! Capability views over domain objects.
//!
//! The walker and the visitors never see concrete domain types. Instead a
//! domain implements these traits on its node handle. Handles are expected
//! to be cheap to clone and to share the underlying object, so the setters
//! take `&self` and mutate through the handle's interior mutability.

use crate::mapping::MappingEntry;
use crate::types::{KeyType, UniqueKey, Version};

/// A node that has an identity.
pub trait Identified {
    /// Name of the node's entity type.
    fn entity_type(&self) -> String;

    /// Current unique key, or `None` if the node is not keyed.
    fn unique_key(&self) -> Option<UniqueKey>;
}

/// A node that links to other nodes.
pub trait Linked: Sized {
    /// Single-valued links in declaration order, by name.
    fn single_links(&self) -> Vec<(String, Option<Self>)>;

    /// Collection-valued links in declaration order, by name.
    fn collection_links(&self) -> Vec<(String, Vec<Option<Self>>)> {
        Vec::new()
    }

    /// All non-null link targets: single links first, then collections.
    fn children(&self) -> Vec<Self> {
        let singles = self
            .single_links()
            .into_iter()
            .filter_map(|(_, target)| target);
        let collections = self
            .collection_links()
            .into_iter()
            .flat_map(|(_, targets)| targets.into_iter().flatten());
        singles.chain(collections).collect()
    }
}

/// A node with a writable key and version.
pub trait Versioned: Identified {
    /// Replaces the node's key.
    fn set_key(&self, key: UniqueKey);

    /// Current version.
    fn version(&self) -> Version;

    /// Replaces the node's version.
    fn set_version(&self, version: Version);
}

/// A node whose key space can be queried and whose key can be dropped.
pub trait Typed: Identified {
    /// Identity space of the current key.
    fn key_type(&self) -> KeyType {
        KeyType::of(self.unique_key().as_ref())
    }

    /// Drops the key so a store mints a fresh one on the next save.
    fn clear_key(&self);
}

/// A node that carries its local/remote mapping.
pub trait Mapped {
    /// Current mapping entry, if the node was ever synchronized.
    fn mapping_entry(&self) -> Option<MappingEntry>;

    /// Replaces the mapping entry.
    fn set_mapping_entry(&self, entry: MappingEntry);
}

/// Everything the synchronizing visitors need from a node.
pub trait SyncNode: Clone + Linked + Versioned + Typed + Mapped {}

impl<T> SyncNode for T where T: Clone + Linked + Versioned + Typed + Mapped {}
