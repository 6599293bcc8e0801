//! Reference domain model and graph snapshots.
//!
//! [`Entity`] is a shared handle to a mutable domain object with named
//! single and collection links. It implements every capability trait the
//! walker and the visitors consume, so tests can build arbitrary, possibly
//! cyclic graphs without a real persistence layer.

use offliner_core::{
    Identified, Linked, Mapped, MappingEntry, Typed, UniqueKey, Version, Versioned,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Mutable state behind an [`Entity`] handle.
#[derive(Default)]
pub struct EntityData {
    /// Entity type name.
    pub entity_type: String,
    /// Current key.
    pub key: Option<UniqueKey>,
    /// Current version.
    pub version: Version,
    /// Free-form payload used to tell objects apart in assertions.
    pub label: String,
    /// Single-valued links in declaration order.
    pub singles: Vec<(String, Option<Entity>)>,
    /// Collection-valued links in declaration order.
    pub collections: Vec<(String, Vec<Option<Entity>>)>,
    /// Mapping entry, once synchronized.
    pub mapping: Option<MappingEntry>,
}

/// Shared handle to a domain object.
///
/// Clones share the same object. Equality is identity.
#[derive(Clone)]
pub struct Entity(Arc<RwLock<EntityData>>);

impl Entity {
    /// Creates an entity with the given key and version.
    pub fn new(entity_type: &str, key: Option<UniqueKey>, version: Version) -> Self {
        Self(Arc::new(RwLock::new(EntityData {
            entity_type: entity_type.to_string(),
            key,
            version,
            ..EntityData::default()
        })))
    }

    /// Creates an entity carrying a remote key.
    pub fn remote(entity_type: &str, id: u64, version: u64) -> Self {
        Self::new(
            entity_type,
            Some(UniqueKey::remote(entity_type, id)),
            Version::new(version),
        )
    }

    /// Creates an entity carrying a local key.
    pub fn local(entity_type: &str, id: u64, version: u64) -> Self {
        Self::new(
            entity_type,
            Some(UniqueKey::local(entity_type, id)),
            Version::new(version),
        )
    }

    /// Creates an entity without a key.
    pub fn unkeyed(entity_type: &str) -> Self {
        Self::new(entity_type, None, Version::INITIAL)
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(self, label: &str) -> Self {
        self.0.write().label = label.to_string();
        self
    }

    /// Returns the label.
    pub fn label(&self) -> String {
        self.0.read().label.clone()
    }

    /// Sets or replaces a single-valued link.
    pub fn set_link(&self, name: &str, target: Option<&Entity>) {
        let mut data = self.0.write();
        let target = target.cloned();
        match data.singles.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = target,
            None => data.singles.push((name.to_string(), target)),
        }
    }

    /// Appends an entity to a collection link, creating the collection.
    pub fn push_child(&self, collection: &str, child: &Entity) {
        self.push_slot(collection, Some(child.clone()));
    }

    /// Appends a null entry to a collection link.
    pub fn push_null(&self, collection: &str) {
        self.push_slot(collection, None);
    }

    /// Overwrites the mapping entry directly, or drops it.
    pub fn put_mapping(&self, entry: Option<MappingEntry>) {
        self.0.write().mapping = entry;
    }

    /// Returns true if both handles point at the same object.
    pub fn same(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn push_slot(&self, collection: &str, slot: Option<Entity>) {
        let mut data = self.0.write();
        match data.collections.iter_mut().find(|(n, _)| n == collection) {
            Some((_, items)) => items.push(slot),
            None => data.collections.push((collection.to_string(), vec![slot])),
        }
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    // Links are left out: graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        match &data.key {
            Some(key) => write!(f, "Entity({key} {})", data.version),
            None => write!(f, "Entity({} unkeyed {})", data.entity_type, data.version),
        }
    }
}

impl Identified for Entity {
    fn entity_type(&self) -> String {
        self.0.read().entity_type.clone()
    }

    fn unique_key(&self) -> Option<UniqueKey> {
        self.0.read().key.clone()
    }
}

impl Linked for Entity {
    fn single_links(&self) -> Vec<(String, Option<Self>)> {
        self.0.read().singles.clone()
    }

    fn collection_links(&self) -> Vec<(String, Vec<Option<Self>>)> {
        self.0.read().collections.clone()
    }
}

impl Versioned for Entity {
    fn set_key(&self, key: UniqueKey) {
        self.0.write().key = Some(key);
    }

    fn version(&self) -> Version {
        self.0.read().version
    }

    fn set_version(&self, version: Version) {
        self.0.write().version = version;
    }
}

impl Typed for Entity {
    fn clear_key(&self) {
        self.0.write().key = None;
    }
}

impl Mapped for Entity {
    fn mapping_entry(&self) -> Option<MappingEntry> {
        self.0.read().mapping.clone()
    }

    fn set_mapping_entry(&self, entry: MappingEntry) {
        self.0.write().mapping = Some(entry);
    }
}

/// Node-free view of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity type name.
    pub entity_type: String,
    /// Key at snapshot time.
    pub key: Option<UniqueKey>,
    /// Version at snapshot time.
    pub version: Version,
    /// Label.
    pub label: String,
    /// Mapping entry at snapshot time.
    pub mapping: Option<MappingEntry>,
}

impl EntitySnapshot {
    /// Captures one entity.
    pub fn of(entity: &Entity) -> Self {
        let data = entity.0.read();
        Self {
            entity_type: data.entity_type.clone(),
            key: data.key.clone(),
            version: data.version,
            label: data.label.clone(),
            mapping: data.mapping.clone(),
        }
    }
}

/// Every entity reachable from `root`, each once, in depth-first preorder.
pub fn reachable(root: &Entity) -> Vec<Entity> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(entity) = stack.pop() {
        if !seen.insert(entity.address()) {
            continue;
        }
        let mut children = entity.children();
        children.reverse();
        stack.extend(children);
        order.push(entity);
    }
    order
}

/// Snapshots every entity reachable from `root`.
pub fn snapshot_graph(root: &Entity) -> Vec<EntitySnapshot> {
    reachable(root).iter().map(EntitySnapshot::of).collect()
}

/// Renders a graph snapshot as pretty JSON.
pub fn graph_json(root: &Entity) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&snapshot_graph(root))
}

/// Builds the small order graph used across tests.
///
/// `customer <- order -> [line1, line2]`, with each line pointing back at
/// the order, all carrying remote keys.
pub fn order_graph() -> OrderGraph {
    let customer = Entity::remote("customer", 10, 3).with_label("ada");
    let order = Entity::remote("order", 20, 5).with_label("order-20");
    let line1 = Entity::remote("line", 30, 1).with_label("widget");
    let line2 = Entity::remote("line", 31, 2).with_label("gadget");

    order.set_link("customer", Some(&customer));
    order.push_child("lines", &line1);
    order.push_child("lines", &line2);
    line1.set_link("order", Some(&order));
    line2.set_link("order", Some(&order));

    OrderGraph {
        customer,
        order,
        line1,
        line2,
    }
}

/// Handles into the graph built by [`order_graph`].
#[derive(Debug, Clone)]
pub struct OrderGraph {
    /// Linked from the order.
    pub customer: Entity,
    /// Root of the graph.
    pub order: Entity,
    /// First order line; links back to the order.
    pub line1: Entity,
    /// Second order line; links back to the order.
    pub line2: Entity,
}

impl OrderGraph {
    /// All four entities.
    pub fn all(&self) -> [&Entity; 4] {
        [&self.customer, &self.order, &self.line1, &self.line2]
    }
}
