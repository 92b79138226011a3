//! Read-through helpers for data-fetch routines.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::policy::CacheKey;
use super::ttl_cache::TtlCache;

impl TtlCache {
    /// Fetch a value with a cache-first strategy.
    ///
    /// 1. Check cache - if valid, return it without calling `fetch`
    /// 2. On a miss, await `fetch`
    /// 3. On success, cache the result for `ttl` and return it
    /// 4. On failure, return the error; nothing is cached or retried
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }

        debug!(key, "Fetching from upstream");
        let fresh = fetch().await?;
        self.set(key, &fresh, ttl);
        Ok(fresh)
    }

    /// Same as [`TtlCache::get_or_fetch`], with the TTL taken from the key's category.
    pub async fn get_or_fetch_keyed<T, E, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_fetch(key.as_str(), key.ttl(), fetch).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::store::{KeyValueStore, MemoryStore};

    fn setup() -> (TtlCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let cache = TtlCache::new("stonks_cache_", store.clone()).with_clock(clock.clone());
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let (cache, store, _) = setup();
        let calls = AtomicUsize::new(0);

        let result: Result<Value, String> = cache
            .get_or_fetch("trending_10", Duration::from_secs(600), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!([{"symbol": "NVDA"}]))
            })
            .await;

        assert_eq!(result.unwrap(), json!([{"symbol": "NVDA"}]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.get_item("stonks_cache_trending_10").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let (cache, _, _) = setup();
        let calls = AtomicUsize::new(0);
        cache.set("quote_AAPL", &json!({"price": 190.0}), Duration::from_secs(300));

        let result: Result<Value, String> = cache
            .get_or_fetch("quote_AAPL", Duration::from_secs(300), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(null))
            })
            .await;

        assert_eq!(result.unwrap(), json!({"price": 190.0}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let (cache, store, _) = setup();

        let result: Result<Value, String> = cache
            .get_or_fetch("quote_ZZZZ", Duration::from_secs(300), || async {
                Err("Stock not found".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "Stock not found");
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (cache, _, clock) = setup();
        let key = CacheKey::quote("AAPL");
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: Result<i32, String> = cache
                .get_or_fetch_keyed(&key, || async {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as i32)
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(key.ttl() + Duration::from_millis(1));
        let result: Result<i32, String> = cache
            .get_or_fetch_keyed(&key, || async {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as i32)
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_succeeds_when_store_is_broken() {
        let (cache, store, _) = setup();
        store.fail_reads(true);
        store.fail_writes(true);

        let result: Result<Value, String> = cache
            .get_or_fetch_keyed(&CacheKey::ai_insights("TSLA"), || async {
                Ok(json!({"recommendation": "hold"}))
            })
            .await;

        assert_eq!(result.unwrap(), json!({"recommendation": "hold"}));
        assert_eq!(cache.stats().write_failures, 1);
    }
}
