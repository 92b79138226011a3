//! TTL Cache Module
//!
//! Namespaced TTL cache over a shared key-value store. Every failure is
//! resolved internally: reads degrade to a miss, writes to a no-op.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::entry::{duration_to_ms, CacheEntry};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::error::CacheError;
use crate::store::KeyValueStore;

// == TTL Cache ==
/// A cache that owns every store key starting with its namespace, and no other.
///
/// Expiry is lazy: an entry is only checked, and removed, when it is read.
pub struct TtlCache {
    /// Prefix prepended to every caller key
    namespace: String,
    /// Shared backing store
    store: Arc<dyn KeyValueStore>,
    /// Source of entry timestamps
    clock: Arc<dyn Clock>,
    /// Hit, miss and failure counters
    stats: StatsRecorder,
    /// Storage keys whose record could not be removed, with the time it was
    /// invalidated. Records written at or before that time read as absent.
    superseded: RwLock<HashMap<String, i64>>,
}

impl TtlCache {
    // == Constructor ==
    /// Creates a cache owning the `namespace` partition of `store`.
    pub fn new(namespace: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            clock: Arc::new(SystemClock),
            stats: StatsRecorder::default(),
            superseded: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the wall clock used to stamp and check entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    // == Set ==
    /// Caches `data` under `key` for `ttl`, replacing any previous entry.
    ///
    /// Never fails: if the store rejects the write, the cache is left without
    /// an entry for `key` and the caller carries on uncached.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) {
        if let Err(err) = self.try_set(key, data, ttl) {
            self.stats.record_write_failure();
            warn!(key, error = %err, "Failed to cache data");

            // A rejected overwrite must not leave the previous value readable
            if !key.is_empty() {
                if let Err(err) = self.invalidate(&self.storage_key(key)) {
                    warn!(key, error = %err, "Failed to remove superseded cache entry");
                }
            }
        }
    }

    fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        if duration_to_ms(ttl) == 0 {
            return Err(CacheError::InvalidTtl);
        }

        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);
        let raw = serde_json::to_string(&entry).map_err(|source| CacheError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let storage_key = self.storage_key(key);
        self.store.set_item(&storage_key, &raw)?;
        self.forget_superseded(&storage_key);

        debug!(key, ttl_ms = entry.ttl, "Cached entry");
        Ok(())
    }

    // == Get ==
    /// Returns the cached value for `key` if present, readable and unexpired.
    ///
    /// Expired and unreadable records are removed from the store.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(Some(data)) => {
                self.stats.record_hit();
                debug!(key, "Cache hit");
                Some(data)
            }
            Ok(None) => {
                self.stats.record_miss();
                debug!(key, "Cache miss");
                None
            }
            Err(err @ CacheError::Corrupt { .. }) => {
                self.stats.record_corrupt();
                self.stats.record_miss();
                warn!(key, error = %err, "Discarded unreadable cache entry");
                None
            }
            Err(err) => {
                self.stats.record_miss();
                warn!(key, error = %err, "Failed to read cache");
                None
            }
        }
    }

    fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let storage_key = self.storage_key(key);
        let Some(raw) = self.store.get_item(&storage_key)? else {
            self.forget_superseded(&storage_key);
            return Ok(None);
        };

        // Check the envelope first so an expired entry is never decoded as T
        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(source) => {
                self.purge(&storage_key);
                return Err(CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                });
            }
        };

        if let Some(invalidated_at) = self.superseded_at(&storage_key) {
            if entry.created_at <= invalidated_at {
                if self.store.remove_item(&storage_key).is_ok() {
                    self.forget_superseded(&storage_key);
                }
                debug!(key, "Skipped superseded entry");
                return Ok(None);
            }
            // Rewritten since it was hidden
            self.forget_superseded(&storage_key);
        }

        if entry.is_expired_at(self.clock.now_ms()) {
            self.stats.record_expired();
            self.purge(&storage_key);
            debug!(key, "Evicted expired entry");
            return Ok(None);
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Ok(Some(data)),
            Err(source) => {
                self.purge(&storage_key);
                Err(CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    fn purge(&self, storage_key: &str) {
        if let Err(err) = self.invalidate(storage_key) {
            warn!(key = storage_key, error = %err, "Failed to remove stale cache record");
        }
    }

    /// Removes a record, or failing that, hides it from later reads.
    fn invalidate(&self, storage_key: &str) -> Result<(), CacheError> {
        match self.store.remove_item(storage_key) {
            Ok(()) => {
                self.forget_superseded(storage_key);
                Ok(())
            }
            Err(err) => {
                if let Ok(mut superseded) = self.superseded.write() {
                    superseded.insert(storage_key.to_string(), self.clock.now_ms());
                }
                Err(err.into())
            }
        }
    }

    fn superseded_at(&self, storage_key: &str) -> Option<i64> {
        self.superseded
            .read()
            .ok()
            .and_then(|superseded| superseded.get(storage_key).copied())
    }

    fn forget_superseded(&self, storage_key: &str) {
        if let Ok(mut superseded) = self.superseded.write() {
            superseded.remove(storage_key);
        }
    }

    // == Delete ==
    /// Removes the entry for `key`. Absent keys and store failures are ignored.
    pub fn delete(&self, key: &str) {
        if let Err(err) = self.try_delete(key) {
            warn!(key, error = %err, "Failed to delete cache entry");
        }
    }

    fn try_delete(&self, key: &str) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        self.invalidate(&self.storage_key(key))
    }

    // == Clear ==
    /// Removes every entry in this cache's namespace, leaving other keys alone.
    pub fn clear(&self) {
        match self.try_clear() {
            Ok(removed) => info!(namespace = %self.namespace, removed, "Cleared cache"),
            Err(err) => warn!(namespace = %self.namespace, error = %err, "Failed to clear cache"),
        }
    }

    fn try_clear(&self) -> Result<usize, CacheError> {
        if self.namespace.is_empty() {
            return Err(CacheError::EmptyNamespace);
        }

        let mut removed = 0;
        for key in self.owned_keys()? {
            match self.invalidate(&key) {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "Failed to remove cache record"),
            }
        }
        Ok(removed)
    }

    fn owned_keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(&self.namespace))
            .collect())
    }

    // == Length ==
    /// Number of records in this namespace, expired ones included.
    ///
    /// Returns 0 when the store cannot be listed.
    pub fn len(&self) -> usize {
        self.owned_keys().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
