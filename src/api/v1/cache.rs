//! Cache administration endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, ClearCacheParams, ClearCacheResponse, Json};
use crate::domain::semantic_cache::CacheStats;

/// GET /v1/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.orchestrator.cache_stats().await)
}

/// DELETE /v1/cache?reset_stats=true
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheParams>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    state.orchestrator.clear_cache(params.reset_stats).await?;
    info!(reset_stats = params.reset_stats, "Cache cleared");

    Ok(Json(ClearCacheResponse {
        cleared: true,
        stats_reset: params.reset_stats,
        stats: state.orchestrator.cache_stats().await,
    }))
}

/// GET /v1/cache/health
pub async fn cache_health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.orchestrator.cache_health().await;
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}
