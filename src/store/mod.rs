//! Key-Value Store Module
//!
//! The persistent, shared string store the TTL cache sits on. Several
//! handles may point at the same underlying data; none of them owns it.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

// == Public Constants ==
/// Default byte quota, matching what browsers grant an origin's local storage
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

// == Key-Value Store Trait ==
/// A string-to-string store shared by everything that holds a handle to it.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Lists every key currently in the store, owned or not.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Bytes charged against the quota for one item.
pub(crate) fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Checks that replacing `key` with `value` keeps a store of `current` bytes
/// within `quota`. `previous` is the value being replaced, if any.
pub(crate) fn check_quota(
    current: usize,
    previous: Option<&str>,
    key: &str,
    value: &str,
    quota: usize,
) -> Result<(), StoreError> {
    let freed = previous.map(|old| item_size(key, old)).unwrap_or(0);
    let needed = current - freed + item_size(key, value);
    if needed > quota {
        return Err(StoreError::QuotaExceeded { needed, quota });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_allows_exact_fit() {
        assert!(check_quota(0, None, "ab", "cd", 4).is_ok());
    }

    #[test]
    fn test_quota_rejects_overflow() {
        let result = check_quota(3, None, "ab", "cd", 6);
        assert!(matches!(
            result,
            Err(StoreError::QuotaExceeded { needed: 7, quota: 6 })
        ));
    }

    #[test]
    fn test_quota_credits_replaced_value() {
        // "k" + "old" already counted in the 4 current bytes
        assert!(check_quota(4, Some("old"), "k", "new", 4).is_ok());
    }
}
