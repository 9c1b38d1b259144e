//! Question answering endpoints

use axum::extract::{Path, Query, State};
use futures::future::join_all;
use tracing::info;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, BatchItem, BatchQueryBody, BatchQueryResponse, Json, QueryBody, SimilarParams,
    SimilarResponse,
};
use crate::domain::graph::ChunkContext;
use crate::domain::query::{QueryRequest, QueryResult};

/// POST /v1/query
pub async fn answer_question(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryResult>, ApiError> {
    body.validate()?;

    let result = state
        .orchestrator
        .answer_question(QueryRequest::from(body))
        .await?;

    Ok(Json(result))
}

/// POST /v1/query/batch
pub async fn answer_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchQueryBody>,
) -> Result<Json<BatchQueryResponse>, ApiError> {
    body.validate()?;

    for (index, question) in body.questions.iter().enumerate() {
        question.validate().map_err(|e| {
            let err = ApiError::from(e);
            let param = err.response.error.param.clone().unwrap_or_default();
            err.with_param(format!("questions[{}].{}", index, param))
        })?;
    }

    info!(count = body.questions.len(), "Processing batch query");

    let answers = join_all(body.questions.into_iter().map(|question| {
        let orchestrator = state.orchestrator.clone();
        async move {
            let text = question.question.clone();
            match orchestrator.answer_question(QueryRequest::from(question)).await {
                Ok(result) => BatchItem::Answered(result),
                Err(e) => BatchItem::Failed {
                    question: text,
                    error: ApiError::from(e).response.error,
                },
            }
        }
    }))
    .await;

    Ok(Json(BatchQueryResponse::new(answers)))
}

/// GET /v1/query/similar?text=..&k=..
pub async fn find_similar(
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarResponse>, ApiError> {
    params.validate()?;

    let results = state
        .orchestrator
        .find_similar(&params.text, params.k)
        .await?;

    Ok(Json(SimilarResponse {
        text: params.text,
        count: results.len(),
        results,
    }))
}

/// GET /v1/query/context/{chunk_id}
pub async fn chunk_context(
    State(state): State<AppState>,
    Path(chunk_id): Path<String>,
) -> Result<Json<ChunkContext>, ApiError> {
    state
        .graph
        .chunk_context(&chunk_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Chunk {} not found", chunk_id)))
}
