//! Persistent versioned map: every mutation yields a new snapshot, old snapshots stay readable.
//!
//! A [`VersionedMap`] is a handle to the tip of a chain of immutable [`Snapshot`]s. Each
//! snapshot records only the keys it changed relative to its parent, either as a new value or
//! as a tombstone ([`Slot::Removed`]). Handles are cheap to clone and can branch: inserting
//! twice from the same handle produces two independent histories sharing a common ancestor.
//!
//! # Invariants
//! - History is append-only. No snapshot is modified after construction.
//! - A key resolves to the first delta entry found walking from the tip toward the root.
//! - Tombstones are durable: rolling back past a removal reveals the prior value.
//! - Parents never reference children, so plain reference counting reclaims history.
//!
//! ```
//! use timemap::VersionedMap;
//!
//! let v0: VersionedMap<&str, i32> = [("foo", 1)].into_iter().collect();
//! let v1 = v0.insert("bar", 2);
//! let v2 = v1.remove("foo");
//!
//! assert_eq!(v2.get(&"foo"), None);
//! assert_eq!(v2.rollback().get(&"foo"), Some(&1));
//! assert_eq!(v0.get(&"bar"), None);
//! ```

pub mod error;
pub mod map;
pub mod policy;
pub mod slot;
pub mod snapshot;

pub use error::MapError;
pub use map::{Iter, VersionedMap};
pub use policy::{FlattenMode, HistoryPolicy};
pub use slot::Slot;
pub use snapshot::{History, Snapshot};

#[cfg(test)]
mod testing;

/// Short identification string, used by the CLI `info` command.
pub fn crate_info() -> &'static str {
    concat!("timemap v", env!("CARGO_PKG_VERSION"))
}
