//! Storage collaborator contract and an in-memory store.

use crate::error::{StoreError, StoreResult};
use offliner_core::{KeySpace, UniqueKey, Version, Versioned};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Key and version of a stored object after a read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHead {
    /// Key of the stored object.
    pub key: UniqueKey,
    /// Version of the stored object.
    pub version: Version,
}

/// A store scoped to one identity space.
///
/// Each `save_or_update` is expected to be independently durable: once it
/// returns, the next run sees the write.
pub trait NodeStore<N> {
    /// Identity space this store mints keys in.
    fn space(&self) -> KeySpace;

    /// Looks up the current head of an object.
    fn find_by_id(&self, entity_type: &str, id: u64) -> StoreResult<Option<StoredHead>>;

    /// Inserts an unkeyed node or updates a keyed one.
    ///
    /// On success the node's key and version are rewritten to the stored
    /// head. A keyed node must carry the currently stored version.
    fn save_or_update(&self, node: &N) -> StoreResult<StoredHead>;
}

impl<N, T> NodeStore<N> for &T
where
    T: NodeStore<N> + ?Sized,
{
    fn space(&self) -> KeySpace {
        (**self).space()
    }

    fn find_by_id(&self, entity_type: &str, id: u64) -> StoreResult<Option<StoredHead>> {
        (**self).find_by_id(entity_type, id)
    }

    fn save_or_update(&self, node: &N) -> StoreResult<StoredHead> {
        (**self).save_or_update(node)
    }
}

impl<N, T> NodeStore<N> for Arc<T>
where
    T: NodeStore<N> + ?Sized,
{
    fn space(&self) -> KeySpace {
        (**self).space()
    }

    fn find_by_id(&self, entity_type: &str, id: u64) -> StoreResult<Option<StoredHead>> {
        (**self).find_by_id(entity_type, id)
    }

    fn save_or_update(&self, node: &N) -> StoreResult<StoredHead> {
        (**self).save_or_update(node)
    }
}

/// An in-memory store that keeps the version of every row.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Ephemeral sessions that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
#[derive(Debug)]
pub struct InMemoryStore {
    space: KeySpace,
    rows: RwLock<BTreeMap<UniqueKey, Version>>,
    next_id: AtomicU64,
    saves: AtomicU64,
    rejected: RwLock<HashMap<UniqueKey, String>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store for the given space.
    #[must_use]
    pub fn new(space: KeySpace) -> Self {
        Self {
            space,
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            saves: AtomicU64::new(0),
            rejected: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Creates an empty local store.
    #[must_use]
    pub fn local() -> Self {
        Self::new(KeySpace::Local)
    }

    /// Creates an empty remote store.
    #[must_use]
    pub fn remote() -> Self {
        Self::new(KeySpace::Remote)
    }

    /// Seeds a row directly, bypassing version checks.
    ///
    /// Useful for preparing remote state in tests.
    pub fn insert(&self, entity_type: &str, id: u64, version: Version) -> UniqueKey {
        let key = UniqueKey::new(entity_type, self.space, id);
        self.rows.write().insert(key.clone(), version);
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        key
    }

    /// Removes a row.
    pub fn remove(&self, key: &UniqueKey) -> Option<Version> {
        self.rows.write().remove(key)
    }

    /// Returns the stored version of a row.
    #[must_use]
    pub fn version_of(&self, key: &UniqueKey) -> Option<Version> {
        self.rows.read().get(key).copied()
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Returns how many successful saves the store has performed.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every save of `key` fail with [`StoreError::Rejected`].
    pub fn reject_saves_for(&self, key: UniqueKey, reason: impl Into<String>) {
        self.rejected.write().insert(key, reason.into());
    }

    /// Simulates an outage: all reads and writes fail with
    /// [`StoreError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Removes all injected faults.
    pub fn clear_faults(&self) {
        self.rejected.write().clear();
        self.set_unavailable(false);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{} store is offline", self.space)));
        }
        Ok(())
    }
}

impl<N: Versioned> NodeStore<N> for InMemoryStore {
    fn space(&self) -> KeySpace {
        self.space
    }

    fn find_by_id(&self, entity_type: &str, id: u64) -> StoreResult<Option<StoredHead>> {
        self.check_available()?;
        let key = UniqueKey::new(entity_type, self.space, id);
        Ok(self
            .rows
            .read()
            .get(&key)
            .map(|version| StoredHead {
                key: key.clone(),
                version: *version,
            }))
    }

    fn save_or_update(&self, node: &N) -> StoreResult<StoredHead> {
        self.check_available()?;
        if let Some(key) = node.unique_key() {
            if let Some(reason) = self.rejected.read().get(&key) {
                return Err(StoreError::Rejected {
                    key,
                    reason: reason.clone(),
                });
            }
        }
        let head = {
            let mut rows = self.rows.write();
            match node.unique_key() {
                None => {
                    let id = self
                        .next_id
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
                        .map_err(|_| StoreError::IdsExhausted { space: self.space })?;
                    let key = UniqueKey::new(node.entity_type(), self.space, id);
                    rows.insert(key.clone(), Version::INITIAL);
                    StoredHead {
                        key,
                        version: Version::INITIAL,
                    }
                }
                Some(key) => {
                    if key.space() != self.space {
                        return Err(StoreError::ForeignKey {
                            key,
                            space: self.space,
                        });
                    }
                    let Some(stored) = rows.get_mut(&key) else {
                        return Err(StoreError::NotFound { key });
                    };
                    let expected = node.version();
                    if *stored != expected {
                        return Err(StoreError::StaleVersion {
                            key,
                            expected,
                            actual: *stored,
                        });
                    }
                    *stored = stored.next().ok_or_else(|| StoreError::Rejected {
                        key: key.clone(),
                        reason: "version counter exhausted".into(),
                    })?;
                    StoredHead {
                        key,
                        version: *stored,
                    }
                }
            }
        };

        node.set_key(head.key.clone());
        node.set_version(head.version);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(head)
    }
}
