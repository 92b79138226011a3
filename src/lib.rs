//! Stonks Cache - A namespaced TTL cache for stock data
//!
//! Caches quotes, charts, search results, market lists and AI insights as
//! JSON in a shared persistent key-value store, with per-entry expiry.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{CacheCategory, CacheKey, TtlCache};
pub use config::Config;
