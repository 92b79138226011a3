//! Cache Module
//!
//! Namespaced TTL caching of JSON values over a shared key-value store.

mod clock;
mod entry;
mod policy;
mod read_through;
mod stats;
mod ttl_cache;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{duration_to_ms, CacheEntry};
pub use policy::{CacheCategory, CacheKey};
pub use stats::CacheStats;
pub use ttl_cache::TtlCache;

// == Public Constants ==
/// Namespace prefix used when none is configured
pub const DEFAULT_NAMESPACE: &str = "stonks_cache_";

/// Maximum allowed caller key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
