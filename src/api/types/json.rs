//! JSON extractor whose rejections use the API error body

use axum::{
    Json as AxumJson,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use super::error::{ApiError, ApiErrorType};
use crate::domain::query::QueryStage;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// `axum::Json` that rejects with [`ApiError`] tagged as a request-stage failure
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        AxumJson::<T>::from_request(req, state)
            .await
            .map(|AxumJson(value)| Json(value))
            .map_err(ApiError::from)
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();

        let (message, param) = match &rejection {
            JsonRejection::JsonDataError(_) => {
                let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(&text);
                (format!("Invalid request body: {}", detail), body_param(detail))
            }
            JsonRejection::JsonSyntaxError(_) => (format!("Invalid JSON syntax: {}", text), None),
            JsonRejection::MissingJsonContentType(_) => (
                "Missing Content-Type header. Expected 'application/json'.".to_string(),
                None,
            ),
            _ => (format!("Failed to read request body: {}", text), None),
        };

        let error = ApiError::new(rejection.status(), ApiErrorType::InvalidRequestError, message)
            .with_stage(QueryStage::Request);

        match param {
            Some(param) => error.with_param(param),
            None => error,
        }
    }
}

/// Field named by a deserialization error, e.g. `questions[1].top_k`
fn body_param(detail: &str) -> Option<String> {
    let (path, reason) = match detail.split_once(": ") {
        Some((path, reason)) if !path.is_empty() && !path.contains(' ') => (Some(path), reason),
        _ => (None, detail),
    };

    let missing = reason
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next());

    match (path, missing) {
        (Some(path), Some(field)) => Some(format!("{}.{}", path, field)),
        (Some(path), None) => Some(path.to_string()),
        (None, Some(field)) => Some(field.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::QueryBody;
    use axum::body::Body;
    use axum::http::{StatusCode, header};

    async fn extract(content_type: Option<&str>, body: &str) -> Result<QueryBody, ApiError> {
        let mut builder = Request::builder().method("POST").uri("/v1/query");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        Json::<QueryBody>::from_request(request, &())
            .await
            .map(|Json(body)| body)
    }

    #[test]
    fn test_body_param() {
        assert_eq!(
            body_param("missing field `question` at line 1 column 8").as_deref(),
            Some("question")
        );
        assert_eq!(
            body_param("top_k: invalid type: string \"x\", expected usize").as_deref(),
            Some("top_k")
        );
        assert_eq!(
            body_param("questions[1]: missing field `question`").as_deref(),
            Some("questions[1].question")
        );
        assert_eq!(body_param("expected value at line 1 column 1"), None);
    }

    #[tokio::test]
    async fn test_valid_body() {
        let body = extract(Some("application/json"), r#"{"question": "Who founded Acme?"}"#)
            .await
            .unwrap();

        assert_eq!(body.question, "Who founded Acme?");
    }

    #[tokio::test]
    async fn test_wrong_field_type_names_param() {
        let err = extract(Some("application/json"), r#"{"question": "q", "top_k": "three"}"#)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.response.error.param.as_deref(), Some("top_k"));
        assert_eq!(err.response.error.stage, Some(QueryStage::Request));
    }

    #[tokio::test]
    async fn test_missing_field_names_param() {
        let err = extract(Some("application/json"), r#"{"q": "x"}"#).await.unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.response.error.param.as_deref(), Some("question"));
    }

    #[tokio::test]
    async fn test_syntax_error_and_content_type() {
        let err = extract(Some("application/json"), "{not json").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.response.error.message.starts_with("Invalid JSON syntax"));
        assert!(err.response.error.param.is_none());

        let err = extract(None, r#"{"question": "q"}"#).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.response.error.error_type, ApiErrorType::InvalidRequestError);
    }
}
