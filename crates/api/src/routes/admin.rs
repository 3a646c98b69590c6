//! Cache maintenance routes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use domain::services::CacheKey;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEvictionResponse {
    pub evicted: Vec<CacheKey>,
}

/// DELETE /api/v1/admin/cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheEvictionResponse> {
    state.cache.clear();
    info!("Application cache cleared");

    Json(CacheEvictionResponse {
        evicted: CacheKey::ALL.to_vec(),
    })
}

/// DELETE /api/v1/admin/cache/:key
///
/// `key` is one of `configuration`, `permissions`, `role-permissions` or
/// `session-events`. The next read of that resource goes back to the store.
pub async fn evict_cache_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheEvictionResponse>, ApiError> {
    let key: CacheKey = key.parse()?;
    state.cache.remove(key);
    info!(key = %key, "Cache entry evicted");

    Ok(Json(CacheEvictionResponse { evicted: vec![key] }))
}
