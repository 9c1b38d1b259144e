//! API request, response and error types

pub mod error;
pub mod json;
pub mod query;

pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use query::{
    BatchItem, BatchQueryBody, BatchQueryResponse, ClearCacheParams, ClearCacheResponse,
    QueryBody, SimilarParams, SimilarResponse,
};
