//! Request and response bodies for the query and cache endpoints

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiErrorDetail;
use crate::domain::query::{QueryRequest, QueryResult};
use crate::domain::retrieval::{Evidence, SearchStrategy};
use crate::domain::semantic_cache::CacheStats;

/// `POST /v1/query` body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueryBody {
    #[validate(length(min = 1, max = 1000, message = "must be between 1 and 1000 characters"))]
    pub question: String,

    #[validate(range(min = 1, max = 10, message = "must be between 1 and 10"))]
    #[serde(default)]
    pub top_k: Option<usize>,

    #[serde(default)]
    pub strategy: Option<SearchStrategy>,
}

impl From<QueryBody> for QueryRequest {
    fn from(body: QueryBody) -> Self {
        Self {
            question: body.question,
            top_k: body.top_k,
            strategy: body.strategy,
        }
    }
}

/// `POST /v1/query/batch` body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchQueryBody {
    #[validate(length(min = 1, max = 10, message = "must contain between 1 and 10 questions"))]
    pub questions: Vec<QueryBody>,
}

/// One batch slot: the answer, or why that question failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Answered(QueryResult),
    Failed { question: String, error: ApiErrorDetail },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchQueryResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

impl BatchQueryResponse {
    pub fn new(results: Vec<BatchItem>) -> Self {
        let succeeded = results
            .iter()
            .filter(|item| matches!(item, BatchItem::Answered(_)))
            .count();

        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

/// `GET /v1/query/similar` parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SimilarParams {
    #[validate(length(min = 1, max = 1000, message = "must be between 1 and 1000 characters"))]
    pub text: String,

    #[validate(range(min = 1, max = 20, message = "must be between 1 and 20"))]
    #[serde(default = "default_similar_k")]
    pub k: usize,
}

fn default_similar_k() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub text: String,
    pub count: usize,
    pub results: Vec<Evidence>,
}

/// `DELETE /v1/cache` parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearCacheParams {
    #[serde(default)]
    pub reset_stats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub cleared: bool,
    pub stats_reset: bool,
    pub stats: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(question: &str, top_k: Option<usize>) -> QueryBody {
        QueryBody {
            question: question.to_string(),
            top_k,
            strategy: None,
        }
    }

    #[test]
    fn test_query_body_validation() {
        assert!(body("Who founded Acme?", Some(3)).validate().is_ok());
        assert!(body("", None).validate().is_err());
        assert!(body(&"a".repeat(1001), None).validate().is_err());
        assert!(body("q", Some(0)).validate().is_err());
        assert!(body("q", Some(11)).validate().is_err());
    }

    #[test]
    fn test_query_body_parses_strategy() {
        let parsed: QueryBody =
            serde_json::from_str(r#"{"question": "q", "strategy": "graph"}"#).unwrap();

        assert_eq!(parsed.strategy, Some(SearchStrategy::Graph));
        assert_eq!(parsed.top_k, None);
        assert!(serde_json::from_str::<QueryBody>(r#"{"question": "q", "strategy": "web"}"#).is_err());
    }

    #[test]
    fn test_batch_size_bounds() {
        let empty = BatchQueryBody { questions: vec![] };
        assert!(empty.validate().is_err());

        let too_many = BatchQueryBody {
            questions: (0..11).map(|_| body("q", None)).collect(),
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_batch_response_counts() {
        let response = BatchQueryResponse::new(vec![BatchItem::Failed {
            question: "q".to_string(),
            error: ApiErrorDetail {
                message: "down".to_string(),
                error_type: super::super::error::ApiErrorType::ServiceUnavailableError,
                stage: None,
                param: None,
            },
        }]);

        assert_eq!(response.total, 1);
        assert_eq!(response.succeeded, 0);
        assert_eq!(response.failed, 1);
    }
}
