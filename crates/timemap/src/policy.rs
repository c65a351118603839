use serde::{Deserialize, Serialize};

use crate::map::VersionedMap;

/// How a history gets flattened once it grows past the policy threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlattenMode {
    /// Flatten into a new tip and keep the old chain one rollback below it.
    #[default]
    Compact,
    /// Flatten into a new root and drop the old chain.
    Purge,
}

/// Controls when a handle's history is flattened to keep lookups short.
///
/// The default never flattens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryPolicy {
    /// Flatten once this many snapshots have been layered since the last flatten.
    pub flatten_after: Option<usize>,
    pub mode: FlattenMode,
}

impl HistoryPolicy {
    /// A policy that never flattens.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn compact_after(snapshots: usize) -> Self {
        Self {
            flatten_after: Some(snapshots),
            mode: FlattenMode::Compact,
        }
    }

    pub fn purge_after(snapshots: usize) -> Self {
        Self {
            flatten_after: Some(snapshots),
            mode: FlattenMode::Purge,
        }
    }

    /// Whether `map` has accumulated enough unflattened history to trigger this policy.
    pub fn should_flatten<K, V>(&self, map: &VersionedMap<K, V>) -> bool {
        match self.flatten_after {
            Some(limit) => map.tip().since_flatten() >= limit,
            None => false,
        }
    }
}
