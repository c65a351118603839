use serde::{Deserialize, Serialize};

/// The state a snapshot records for one key.
///
/// A key that is missing from a snapshot's delta inherits its state from the parent. A key that
/// is present carries one of these two states, so "no entry here" and "deleted here" never get
/// conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot<V> {
    /// The key maps to this value as of the snapshot.
    Present(V),
    /// The key was explicitly removed as of the snapshot.
    Removed,
}

impl<V> Slot<V> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }

    /// Borrow the value, `None` for a tombstone.
    pub fn as_ref(&self) -> Option<&V> {
        match self {
            Self::Present(value) => Some(value),
            Self::Removed => None,
        }
    }
}
