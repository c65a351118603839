//! Shared test helpers: lookup assertions and a reference model for randomized histories.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::MapError;
use crate::map::VersionedMap;

/// Assert what `lookup` reports for a key: a value, `Removed` or `NotFound`.
macro_rules! assert_lookup {
    ($map:expr, $key:expr, NotFound) => {
        assert_eq!($map.lookup(&$key), Err($crate::MapError::KeyNotFound))
    };
    ($map:expr, $key:expr, Removed) => {
        assert_eq!($map.lookup(&$key), Ok(None))
    };
    ($map:expr, $key:expr, $val:expr) => {
        assert_eq!($map.lookup(&$key), Ok(Some(&$val)))
    };
}

/// Assert the exact active `(key, value)` sequence of a handle, in ascending key order.
macro_rules! assert_active {
    ($map:expr, [$(($key:expr, $val:expr)),* $(,)?]) => {{
        let actual: Vec<_> = $map.iter().collect();
        let expected: Vec<_> = vec![$((&$key, &$val)),*];
        assert_eq!(actual, expected);
    }};
}

pub(crate) use assert_active;
pub(crate) use assert_lookup;

/// Deterministic splitmix64 generator, so randomized tests replay identically.
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// One operation of a randomized history.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Insert(u32, u32),
    Remove(u32),
    Rollback,
    Compact,
    Purge,
}

impl Step {
    /// Mostly inserts and removes, with occasional history operations.
    pub fn random(rng: &mut SplitMix64, key_space: u64) -> Self {
        let key = rng.below(key_space) as u32;
        match rng.below(100) {
            0..=44 => Self::Insert(key, rng.next_u64() as u32),
            45..=74 => Self::Remove(key),
            75..=93 => Self::Rollback,
            94..=98 => Self::Compact,
            _ => Self::Purge,
        }
    }
}

// Model of one version: the active state plus every key any reachable snapshot mentions.
#[derive(Clone, Default)]
struct Level {
    state: BTreeMap<u32, u32>,
    seen: BTreeSet<u32>,
}

/// Replay `steps` against both a `VersionedMap` and a stack of plain `BTreeMap`s and check
/// that they agree after every step. Handles captured along the way are re-checked at the end
/// to make sure later steps never changed them.
pub fn check_against_model(steps: &[Step]) {
    let mut map = VersionedMap::<u32, u32>::empty();
    let mut levels = vec![Level::default()];
    let mut captured: Vec<(VersionedMap<u32, u32>, BTreeMap<u32, u32>)> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let mut top = levels.last().cloned().unwrap_or_default();
        match *step {
            Step::Insert(key, value) => {
                map = map.insert(key, value);
                top.state.insert(key, value);
                top.seen.insert(key);
                levels.push(top);
            }
            Step::Remove(key) => {
                map = map.remove(key);
                top.state.remove(&key);
                top.seen.insert(key);
                levels.push(top);
            }
            Step::Rollback => {
                map = map.rollback();
                if levels.len() > 1 {
                    levels.pop();
                }
            }
            Step::Compact => {
                map = map.compact();
                levels.push(top);
            }
            Step::Purge => {
                map = map.purge();
                top.seen = top.state.keys().copied().collect();
                levels = vec![top];
            }
        }

        let Some(expected) = levels.last() else {
            panic!("model stack emptied at step {index}");
        };
        assert_eq!(map.to_map(), expected.state, "state diverged at step {index}: {step:?}");
        assert_eq!(map.depth() + 1, levels.len(), "depth diverged at step {index}");

        for probe in 0..4 {
            let key = (index as u32).wrapping_mul(7).wrapping_add(probe) % 48;
            let want = match expected.state.get(&key) {
                Some(value) => Ok(Some(value)),
                None if expected.seen.contains(&key) => Ok(None),
                None => Err(MapError::KeyNotFound),
            };
            assert_eq!(map.lookup(&key), want, "lookup of {key} diverged at step {index}");
        }

        if index % 250 == 0 {
            captured.push((map.clone(), expected.state.clone()));
        }
    }

    for (handle, state) in &captured {
        assert_eq!(&handle.to_map(), state);
    }
}
