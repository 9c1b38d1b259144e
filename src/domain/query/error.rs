//! Query pipeline errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::DomainError;

/// Pipeline stage a query was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    Request,
    Embedding,
    CacheLookup,
    Retrieval,
    Generation,
    CacheStore,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Embedding => "embedding",
            Self::CacheLookup => "cache_lookup",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::CacheStore => "cache_store",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal query errors; each one names the stage that failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Embedding failed: {message}")]
    EmbeddingFailed { message: String },

    #[error("Retrieval unavailable: {message}")]
    RetrievalUnavailable { message: String },

    #[error("Generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("Stage '{stage}' timed out after {timeout_ms}ms")]
    Timeout { stage: QueryStage, timeout_ms: u64 },

    #[error("Internal error in stage '{stage}': {message}")]
    Internal { stage: QueryStage, message: String },
}

impl QueryError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn embedding_failed(error: impl fmt::Display) -> Self {
        Self::EmbeddingFailed {
            message: error.to_string(),
        }
    }

    pub fn retrieval_unavailable(message: impl Into<String>) -> Self {
        Self::RetrievalUnavailable {
            message: message.into(),
        }
    }

    pub fn generation_failed(error: impl fmt::Display) -> Self {
        Self::GenerationFailed {
            message: error.to_string(),
        }
    }

    pub fn timeout(stage: QueryStage, timeout_ms: u64) -> Self {
        Self::Timeout { stage, timeout_ms }
    }

    pub fn internal(stage: QueryStage, message: impl Into<String>) -> Self {
        Self::Internal {
            stage,
            message: message.into(),
        }
    }

    /// The stage that failed
    pub fn stage(&self) -> QueryStage {
        match self {
            Self::InvalidRequest { .. } => QueryStage::Request,
            Self::EmbeddingFailed { .. } => QueryStage::Embedding,
            Self::RetrievalUnavailable { .. } => QueryStage::Retrieval,
            Self::GenerationFailed { .. } => QueryStage::Generation,
            Self::Timeout { stage, .. } | Self::Internal { stage, .. } => *stage,
        }
    }
}

impl From<DomainError> for QueryError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { message } => Self::InvalidRequest { message },
            other => Self::internal(QueryStage::Request, other.to_string()),
        }
    }
}
