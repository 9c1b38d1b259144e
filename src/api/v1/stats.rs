//! Knowledge graph inspection endpoints

use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::graph::{EmbeddingCoverage, GraphSchema, GraphStats};

/// GET /v1/stats
pub async fn graph_stats(State(state): State<AppState>) -> Result<Json<GraphStats>, ApiError> {
    Ok(Json(state.graph.statistics().await?))
}

/// GET /v1/stats/schema
pub async fn graph_schema(State(state): State<AppState>) -> Result<Json<GraphSchema>, ApiError> {
    Ok(Json(state.graph.schema().await?))
}

/// GET /v1/stats/embeddings
pub async fn embedding_stats(
    State(state): State<AppState>,
) -> Result<Json<EmbeddingCoverage>, ApiError> {
    Ok(Json(state.graph.embedding_coverage().await?))
}
