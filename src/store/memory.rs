//! In-memory store with a byte quota and injectable failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{check_quota, item_size, KeyValueStore, DEFAULT_QUOTA_BYTES};
use crate::error::StoreError;

// == Memory Store ==
/// Process-local stand-in for persistent storage.
///
/// Used by tests and anywhere persistence is not wanted. Reads and writes
/// can be forced to fail to exercise the cache's degraded paths.
#[derive(Debug)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    quota: usize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store with the default quota.
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    /// Creates an empty store holding at most `quota` bytes of keys and values.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    // == Failure Injection ==
    /// Makes `get_item` and `keys` fail while set.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes `set_item` and `remove_item` fail while set.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes a record directly, bypassing quota and failure injection.
    pub fn raw_insert(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut items) = self.items.write() {
            items.insert(key.into(), value.into());
        }
    }

    /// Bytes currently charged against the quota.
    pub fn used_bytes(&self) -> usize {
        self.items
            .read()
            .map(|items| items.iter().map(|(k, v)| item_size(k, v)).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, String>>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        self.items
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, String>>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.items
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.write()?;
        let current = items.iter().map(|(k, v)| item_size(k, v)).sum();
        check_quota(current, items.get(key).map(String::as_str), key, value, self.quota)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.write()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.keys().cloned().collect())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_item() {
        let store = MemoryStore::new();
        store.set_item("k", "v").unwrap();
        assert_eq!(store.get_item("k").unwrap(), Some("v".to_string()));
        assert_eq!(store.get_item("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove_item("missing").is_ok());
    }

    #[test]
    fn test_quota_exceeded_leaves_store_unchanged() {
        let store = MemoryStore::with_quota(8);
        store.set_item("a", "1234").unwrap();

        let result = store.set_item("b", "12345");
        assert!(matches!(result, Err(StoreError::QuotaExceeded { .. })));
        assert_eq!(store.get_item("b").unwrap(), None);
        assert_eq!(store.used_bytes(), 5);
    }

    #[test]
    fn test_overwrite_is_charged_once() {
        let store = MemoryStore::with_quota(6);
        store.set_item("k", "abcde").unwrap();
        store.set_item("k", "fghij").unwrap();
        assert_eq!(store.used_bytes(), 6);
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_item("k", "v").unwrap();

        store.fail_writes(true);
        assert!(store.set_item("k", "w").is_err());
        assert!(store.remove_item("k").is_err());
        assert_eq!(store.get_item("k").unwrap(), Some("v".to_string()));

        store.fail_reads(true);
        assert!(store.get_item("k").is_err());
        assert!(store.keys().is_err());

        store.fail_reads(false);
        store.fail_writes(false);
        assert!(store.remove_item("k").is_ok());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_raw_insert_bypasses_quota() {
        let store = MemoryStore::with_quota(1);
        store.raw_insert("big", "not json at all");
        assert_eq!(store.keys().unwrap(), vec!["big".to_string()]);
    }
}
