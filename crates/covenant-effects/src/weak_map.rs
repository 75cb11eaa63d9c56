//! Concurrent identity map with weakly held keys.
//!
//! Entries are keyed by the allocation address of the key `Arc` and hold only a
//! `Weak` to it, so the map never keeps a key alive. While the `Weak` exists
//! the allocation is not freed, so a live address cannot be reused by another
//! key. Entries whose key has been dropped are invisible to lookups and are
//! removed by [`Sweep::sweep`].

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::object::address;

/// Operations the permission runtime needs from a weak map.
pub trait WeakStore<K: ?Sized, V> {
    /// Value stored for `key`, or `default` if there is none.
    fn get_or_default(&self, key: &Arc<K>, default: V) -> V;

    /// Store `value` unless a live entry exists; returns the existing value.
    fn put_if_absent(&self, key: &Arc<K>, value: V) -> Option<V>;

    /// Visit every live entry.
    fn for_each(&self, f: &mut dyn FnMut(Arc<K>, &V));
}

/// Something holding stale entries that can be purged.
pub trait Sweep: Send + Sync {
    /// Remove stale entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

struct Slot<K: ?Sized, V> {
    key: Weak<K>,
    value: V,
}

impl<K: ?Sized, V> Slot<K, V> {
    fn new(key: &Arc<K>, value: V) -> Self {
        Slot {
            key: Arc::downgrade(key),
            value,
        }
    }

    fn is_live(&self) -> bool {
        self.key.strong_count() > 0
    }
}

/// Weak-keyed identity map backed by `DashMap`.
pub struct WeakIdentityMap<K: ?Sized, V> {
    entries: DashMap<usize, Slot<K, V>>,
}

impl<K: ?Sized, V> Default for WeakIdentityMap<K, V> {
    fn default() -> Self {
        WeakIdentityMap {
            entries: DashMap::new(),
        }
    }
}

impl<K: ?Sized, V> WeakIdentityMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &Arc<K>) -> bool {
        self.entries
            .get(&address(key))
            .is_some_and(|slot| slot.is_live())
    }

    pub fn insert(&self, key: &Arc<K>, value: V) {
        self.entries.insert(address(key), Slot::new(key, value));
    }

    pub fn remove(&self, key: &Arc<K>) -> Option<V> {
        self.entries
            .remove(&address(key))
            .filter(|(_, slot)| slot.is_live())
            .map(|(_, slot)| slot.value)
    }

    /// Apply `f` to the value for `key`, inserting `V::default()` first if absent.
    pub fn update<R>(&self, key: &Arc<K>, f: impl FnOnce(&mut V) -> R) -> R
    where
        V: Default,
    {
        let mut slot = self
            .entries
            .entry(address(key))
            .or_insert_with(|| Slot::new(key, V::default()));
        if !slot.is_live() {
            *slot = Slot::new(key, V::default());
        }
        f(&mut slot.value)
    }

    /// Remove every entry whose key has been dropped.
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live());
        before.saturating_sub(self.entries.len())
    }
}

impl<K: ?Sized, V: Clone> WeakIdentityMap<K, V> {
    pub fn get(&self, key: &Arc<K>) -> Option<V> {
        self.entries
            .get(&address(key))
            .filter(|slot| slot.is_live())
            .map(|slot| slot.value.clone())
    }

    /// Live entries, upgraded. The map is not locked while the caller uses them.
    pub fn snapshot(&self) -> Vec<(Arc<K>, V)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let slot = entry.value();
                slot.key.upgrade().map(|k| (k, slot.value.clone()))
            })
            .collect()
    }
}

impl<K: ?Sized, V: Clone> WeakStore<K, V> for WeakIdentityMap<K, V> {
    fn get_or_default(&self, key: &Arc<K>, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    fn put_if_absent(&self, key: &Arc<K>, value: V) -> Option<V> {
        match self.entries.entry(address(key)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    Some(occupied.get().value.clone())
                } else {
                    occupied.insert(Slot::new(key, value));
                    None
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(key, value));
                None
            }
        }
    }

    fn for_each(&self, f: &mut dyn FnMut(Arc<K>, &V)) {
        for (key, value) in self.snapshot() {
            f(key, &value);
        }
    }
}

impl<K: ?Sized + Send + Sync, V: Send + Sync> Sweep for WeakIdentityMap<K, V> {
    fn sweep(&self) -> usize {
        self.purge()
    }
}
