//! Cache Entry Module
//!
//! Defines the persisted record for a cached value and its TTL check.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached value with the metadata needed to decide whether it is still valid.
///
/// Persisted as `{"data": ..., "createdAt": <ms>, "ttl": <ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// Write timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Validity window in milliseconds, counted from `created_at`
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry written at `created_at` that stays valid for `ttl`.
    ///
    /// Sub-millisecond precision in `ttl` is dropped.
    pub fn new(data: T, created_at: i64, ttl: Duration) -> Self {
        Self {
            data,
            created_at,
            ttl: duration_to_ms(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (Unix milliseconds).
    ///
    /// Boundary condition: the entry is still valid when exactly `ttl`
    /// milliseconds have elapsed, and expired one millisecond later.
    pub fn is_expired_at(&self, now: i64) -> bool {
        let elapsed = i128::from(now) - i128::from(self.created_at);
        elapsed > i128::from(self.ttl)
    }

    // == Time To Live ==
    /// Milliseconds of validity left at `now`; 0 once expired.
    pub fn ttl_remaining_ms(&self, now: i64) -> u64 {
        let expires_at = i128::from(self.created_at) + i128::from(self.ttl);
        let remaining = expires_at - i128::from(now);
        u64::try_from(remaining.max(0)).unwrap_or(u64::MAX)
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = CacheEntry::new(json!({"symbol": "AAPL"}), 1_000, Duration::from_secs(5));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            value,
            json!({"data": {"symbol": "AAPL"}, "createdAt": 1_000, "ttl": 5_000})
        );
    }

    #[test]
    fn test_entry_parses_persisted_record() {
        let raw = r#"{"data":[1,2,3],"createdAt":42,"ttl":10}"#;
        let entry: CacheEntry<Vec<u32>> = serde_json::from_str(raw).unwrap();

        assert_eq!(entry.data, vec![1, 2, 3]);
        assert_eq!(entry.created_at, 42);
        assert_eq!(entry.ttl, 10);
    }

    #[test]
    fn test_missing_metadata_fails_to_parse() {
        let raw = r#"{"data":"quote"}"#;
        assert!(serde_json::from_str::<CacheEntry<String>>(raw).is_err());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("v", 1_000, Duration::from_millis(100));

        assert!(!entry.is_expired_at(1_000));
        assert!(!entry.is_expired_at(1_099));
        assert!(!entry.is_expired_at(1_100), "Valid while elapsed == ttl");
        assert!(entry.is_expired_at(1_101));
    }

    #[test]
    fn test_clock_behind_write_is_not_expired() {
        let entry = CacheEntry::new("v", 10_000, Duration::from_millis(1));
        assert!(!entry.is_expired_at(0));
    }

    #[test]
    fn test_huge_ttl_never_overflows() {
        let entry = CacheEntry::new("v", i64::MAX, Duration::MAX);
        assert_eq!(entry.ttl, u64::MAX);
        assert!(!entry.is_expired_at(i64::MAX));
        assert!(entry.ttl_remaining_ms(i64::MIN) > 0);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new("v", 0, Duration::from_secs(10));

        assert_eq!(entry.ttl_remaining_ms(0), 10_000);
        assert_eq!(entry.ttl_remaining_ms(9_000), 1_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }
}
