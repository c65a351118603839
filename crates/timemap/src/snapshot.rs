use std::collections::BTreeMap;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::slot::Slot;

/// One immutable version node.
///
/// A snapshot stores the keys it changed relative to its parent (its delta) and a shared
/// reference to that parent. Several snapshots may share one parent, which is how branches
/// form. Nothing about a snapshot changes after construction.
pub struct Snapshot<K, V> {
    delta: BTreeMap<K, Slot<V>>,
    parent: Option<Arc<Snapshot<K, V>>>,
    /// Rollback steps to the root.
    depth: usize,
    /// Snapshots layered since the last flattened one (root, compact or purge).
    since_flatten: usize,
}

impl<K, V> Snapshot<K, V> {
    /// A root snapshot: no parent, the delta is the complete state.
    pub(crate) fn root(delta: BTreeMap<K, Slot<V>>) -> Self {
        Self {
            delta,
            parent: None,
            depth: 0,
            since_flatten: 0,
        }
    }

    /// A snapshot layered on top of `parent` with the given delta.
    pub(crate) fn child(parent: Arc<Self>, delta: BTreeMap<K, Slot<V>>) -> Self {
        Self {
            delta,
            depth: parent.depth + 1,
            since_flatten: parent.since_flatten + 1,
            parent: Some(parent),
        }
    }

    /// A flattened snapshot whose delta holds the full active state. With a parent this is a
    /// compaction, without one a purge.
    pub(crate) fn flattened(parent: Option<Arc<Self>>, delta: BTreeMap<K, Slot<V>>) -> Self {
        Self {
            delta,
            depth: parent.as_ref().map_or(0, |p| p.depth + 1),
            since_flatten: 0,
            parent,
        }
    }

    /// The keys this snapshot changed relative to its parent.
    pub fn delta(&self) -> &BTreeMap<K, Slot<V>> {
        &self.delta
    }

    pub(crate) fn parent(&self) -> Option<&Snapshot<K, V>> {
        self.parent.as_deref()
    }

    pub(crate) fn parent_arc(&self) -> Option<&Arc<Snapshot<K, V>>> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn since_flatten(&self) -> usize {
        self.since_flatten
    }

    /// Walk from this snapshot to its root, this snapshot first.
    pub fn history(&self) -> History<'_, K, V> {
        History { next: Some(self) }
    }
}

impl<K: Ord, V> Snapshot<K, V> {
    /// The entry this snapshot's own delta holds for `key`, ignoring ancestors.
    pub fn entry(&self, key: &K) -> Option<&Slot<V>> {
        self.delta.get(key)
    }
}

// Dropping the last handle to a long chain would otherwise recurse once per snapshot.
impl<K, V> Drop for Snapshot<K, V> {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            next = match Arc::into_inner(node) {
                Some(mut snapshot) => snapshot.parent.take(),
                None => None,
            };
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Snapshot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("delta", &self.delta)
            .field("depth", &self.depth)
            .field("since_flatten", &self.since_flatten)
            .field("is_root", &self.is_root())
            .finish()
    }
}

/// Iterator over a snapshot and its ancestors, tip first.
pub struct History<'a, K, V> {
    next: Option<&'a Snapshot<K, V>>,
}

impl<'a, K, V> Iterator for History<'a, K, V> {
    type Item = &'a Snapshot<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.next.map_or(0, |s| s.depth + 1);
        (len, Some(len))
    }
}

impl<K, V> ExactSizeIterator for History<'_, K, V> {}

impl<K, V> FusedIterator for History<'_, K, V> {}
