use std::collections::{BTreeMap, BTreeSet, btree_map};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::MapError;
use crate::policy::{FlattenMode, HistoryPolicy};
use crate::slot::Slot;
use crate::snapshot::{History, Snapshot};

/// A handle to one version of a persistent key/value map.
///
/// Every mutating operation returns a new handle and leaves `self` untouched, so any handle
/// kept around keeps observing exactly the state it was created with. Cloning a handle is O(1).
///
/// Enumeration (`active_keys`, `values`, `iter`) always yields keys in ascending `Ord` order,
/// independent of insertion order.
pub struct VersionedMap<K, V> {
    tip: Arc<Snapshot<K, V>>,
}

impl<K, V> VersionedMap<K, V> {
    /// The snapshot this handle points at.
    pub fn tip(&self) -> &Snapshot<K, V> {
        &self.tip
    }

    /// The keys changed by the tip snapshot alone.
    pub fn delta(&self) -> &BTreeMap<K, Slot<V>> {
        self.tip.delta()
    }

    /// Number of rollback steps until the root.
    pub fn depth(&self) -> usize {
        self.tip.depth()
    }

    pub fn is_root(&self) -> bool {
        self.tip.is_root()
    }

    /// Snapshots from the tip down to the root.
    pub fn history(&self) -> History<'_, K, V> {
        self.tip.history()
    }

    /// Step back to the parent version. At the root this returns the root again.
    pub fn rollback(&self) -> Self {
        match self.tip.parent_arc() {
            Some(parent) => Self {
                tip: Arc::clone(parent),
            },
            None => self.clone(),
        }
    }

    /// Whether both handles point at the very same snapshot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.tip, &b.tip)
    }

    fn layer(&self, delta: BTreeMap<K, Slot<V>>) -> Self {
        let tip = Snapshot::child(Arc::clone(&self.tip), delta);
        tracing::trace!(depth = tip.depth(), "layered snapshot");
        Self { tip: Arc::new(tip) }
    }
}

impl<K: Ord, V> VersionedMap<K, V> {
    /// Build a root version holding `initial`.
    pub fn new(initial: BTreeMap<K, V>) -> Self {
        let delta = initial
            .into_iter()
            .map(|(key, value)| (key, Slot::Present(value)))
            .collect();
        Self {
            tip: Arc::new(Snapshot::root(delta)),
        }
    }

    /// A root version with no keys.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    /// A new version where `key` maps to `value`.
    pub fn insert(&self, key: K, value: V) -> Self {
        self.layer(BTreeMap::from([(key, Slot::Present(value))]))
    }

    /// A new version where `key` is tombstoned. Older versions still see the key.
    pub fn remove(&self, key: K) -> Self {
        self.layer(BTreeMap::from([(key, Slot::Removed)]))
    }

    /// Resolve `key` against the nearest snapshot that mentions it.
    ///
    /// Returns `Ok(Some(value))` when that entry is a value and `Ok(None)` when it is a
    /// tombstone. Fails with [`MapError::KeyNotFound`] when no snapshot between the tip and the
    /// root mentions the key at all.
    pub fn lookup(&self, key: &K) -> Result<Option<&V>, MapError> {
        self.history()
            .find_map(|snapshot| snapshot.entry(key))
            .map(Slot::as_ref)
            .ok_or(MapError::KeyNotFound)
    }

    /// The current value of `key`, `None` when removed or never inserted.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.lookup(key).ok().flatten()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Keys that currently have a value, ascending.
    pub fn active_keys(&self) -> BTreeSet<&K> {
        self.resolve().into_keys().collect()
    }

    /// Current values, in the order of [`active_keys`](Self::active_keys).
    pub fn values(&self) -> Vec<&V> {
        self.resolve().into_values().collect()
    }

    /// Current `(key, value)` pairs, ascending by key.
    ///
    /// The active state is resolved once when the iterator is created. Calling `iter` again on
    /// the same handle yields the same sequence.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.resolve().into_iter(),
        }
    }

    /// Number of keys that currently have a value.
    pub fn len(&self) -> usize {
        self.resolve().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Walk tip to root, first entry per key wins. A flattened snapshot already holds the full
    // active state, so nothing below it can add an active key.
    fn resolve(&self) -> BTreeMap<&K, &V> {
        let mut resolved: BTreeMap<&K, &Slot<V>> = BTreeMap::new();
        for snapshot in self.history() {
            for (key, slot) in snapshot.delta() {
                resolved.entry(key).or_insert(slot);
            }
            if snapshot.since_flatten() == 0 {
                break;
            }
        }
        resolved
            .into_iter()
            .filter_map(|(key, slot)| slot.as_ref().map(|value| (key, value)))
            .collect()
    }
}

impl<K: Ord + Clone, V: Clone> VersionedMap<K, V> {
    /// The current active state, cloned out of the history.
    pub fn to_map(&self) -> BTreeMap<K, V> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn flat_delta(&self) -> BTreeMap<K, Slot<V>> {
        self.iter()
            .map(|(key, value)| (key.clone(), Slot::Present(value.clone())))
            .collect()
    }

    /// Flatten the active state into one new snapshot on top of this one.
    ///
    /// Lookups of active keys on the result touch a single snapshot, and one
    /// [`rollback`](Self::rollback) returns to this exact version.
    pub fn compact(&self) -> Self {
        let delta = self.flat_delta();
        tracing::debug!(keys = delta.len(), depth = self.depth(), "compacted history");
        Self {
            tip: Arc::new(Snapshot::flattened(Some(Arc::clone(&self.tip)), delta)),
        }
    }

    /// Flatten the active state into a new root, dropping all history.
    ///
    /// Snapshots only reachable through the old chain are released once other handles to them
    /// are gone. Rollback on the result is a no-op.
    pub fn purge(&self) -> Self {
        let delta = self.flat_delta();
        tracing::debug!(
            keys = delta.len(),
            discarded = self.depth() + 1,
            "purged history"
        );
        Self {
            tip: Arc::new(Snapshot::flattened(None, delta)),
        }
    }

    /// Flatten according to `policy`, or return this same version when it does not apply.
    pub fn apply_policy(&self, policy: &HistoryPolicy) -> Self {
        if !policy.should_flatten(self) {
            return self.clone();
        }
        tracing::debug!(
            mode = ?policy.mode,
            since_flatten = self.tip.since_flatten(),
            "history policy triggered"
        );
        match policy.mode {
            FlattenMode::Compact => self.compact(),
            FlattenMode::Purge => self.purge(),
        }
    }
}

impl<K, V> Clone for VersionedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            tip: Arc::clone(&self.tip),
        }
    }
}

impl<K: Ord, V> Default for VersionedMap<K, V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Ord, V> From<BTreeMap<K, V>> for VersionedMap<K, V> {
    fn from(initial: BTreeMap<K, V>) -> Self {
        Self::new(initial)
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for VersionedMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// Equality is by active content, not by history shape.
impl<K: Ord, V: PartialEq> PartialEq for VersionedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || self.iter().eq(other.iter())
    }
}

impl<K: Ord, V: Eq> Eq for VersionedMap<K, V> {}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for VersionedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Serializes the active state as a map. History is not serialized.
impl<K: Ord + Serialize, V: Serialize> Serialize for VersionedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a VersionedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Iterator over the active `(key, value)` pairs of one version, ascending by key.
pub struct Iter<'a, K, V> {
    inner: btree_map::IntoIter<&'a K, &'a V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
