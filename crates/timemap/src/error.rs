/// Errors from map lookups.
///
/// Every operation other than [`lookup`](crate::VersionedMap::lookup) is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// No snapshot between the tip and the root mentions the key, neither as a value nor as a
    /// tombstone.
    #[error("key not found in any reachable snapshot")]
    KeyNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_not_found_message() {
        assert_eq!(
            MapError::KeyNotFound.to_string(),
            "key not found in any reachable snapshot"
        );
    }
}
