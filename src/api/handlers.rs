//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.
//!
//! Cache calls may hit the disk, so they run on tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::error;

use crate::cache::{duration_to_ms, TtlCache};
use crate::config::Config;
use crate::error::{ApiError, Result, StoreError};
use crate::models::{
    validate_key, ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};
use crate::store::FileStore;

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Shared TTL cache
    pub cache: Arc<TtlCache>,
    /// TTL for writes that do not name one
    pub default_ttl: Duration,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: TtlCache, default_ttl: Duration) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the file-backed store and scopes the cache to the configured namespace.
    pub fn from_config(config: &Config) -> std::result::Result<Self, StoreError> {
        let store = FileStore::open_with_quota(&config.store_path, config.quota_bytes)?;
        let cache = TtlCache::new(config.namespace.clone(), Arc::new(store));
        Ok(Self::new(cache, config.default_ttl()))
    }
}

/// Runs `op` against the cache on the blocking pool.
///
/// A task that fails to complete is logged and reported as `None`, which
/// callers treat like a miss.
async fn with_cache<T, F>(state: &AppState, op: F) -> Option<T>
where
    F: FnOnce(&TtlCache) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(&state.cache);
    match tokio::task::spawn_blocking(move || op(&cache)).await {
        Ok(output) => Some(output),
        Err(err) => {
            error!(error = %err, "Cache task failed");
            None
        }
    }
}

/// Handler for PUT /cache/:key
///
/// Caches a JSON value. A write the store rejects is still acknowledged:
/// the value is simply not cached.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate(&key) {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let ttl = req
        .ttl_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_ttl);
    let cache_key = key.clone();
    with_cache(&state, move |cache| cache.set(&cache_key, &req.value, ttl)).await;

    Ok(Json(SetResponse::new(key, duration_to_ms(ttl))))
}

/// Handler for GET /cache/:key
///
/// Absent, expired and unreadable entries all answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let cache_key = key.clone();
    let value = with_cache(&state, move |cache| cache.get::<Value>(&cache_key))
        .await
        .flatten()
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
///
/// Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let cache_key = key.clone();
    with_cache(&state, move |cache| cache.delete(&cache_key)).await;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
///
/// Removes every entry in the cache's namespace.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    with_cache(&state, |cache| cache.clear()).await;
    Json(ClearResponse::new(state.cache.namespace()))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    let total_entries = with_cache(&state, |cache| cache.len()).await.unwrap_or(0);
    Json(StatsResponse::new(&stats, total_entries))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
