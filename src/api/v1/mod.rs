//! v1 API endpoints

pub mod cache;
pub mod query;
pub mod stats;

use axum::{
    Router,
    routing::{delete, get, post},
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::answer_question))
        .route("/query/batch", post(query::answer_batch))
        .route("/query/similar", get(query::find_similar))
        .route("/query/context/{chunk_id}", get(query::chunk_context))
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache/health", get(cache::cache_health))
        .route("/stats", get(stats::graph_stats))
        .route("/stats/schema", get(stats::graph_schema))
        .route("/stats/embeddings", get(stats::embedding_stats))
}
