//! Request-path errors and their HTTP mapping.
//!
//! Every rejection a pipeline stage can produce is an [`ApiError`]. The client
//! only ever sees the status code and a short `{"error": ...}` body; detail
//! carried by a variant is for logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const RATE_LIMIT_MESSAGE: &str =
    "You have sent too many requests in a given amount of time. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Cross-origin request from an origin outside the allow-list.
    #[error("CORS error: {0} is not allowed by CORS")]
    OriginNotAllowed(String),

    /// Body declared as JSON or form data that could not be parsed.
    #[error("malformed request body: {0}")]
    BadRequestBody(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("no route for {method} {path}")]
    NotFound { method: String, path: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequestBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::OriginNotAllowed(_) => "Not allowed by CORS",
            ApiError::BadRequestBody(_) => "Malformed request body",
            ApiError::PayloadTooLarge { .. } => "Request body too large",
            ApiError::RateLimitExceeded => RATE_LIMIT_MESSAGE,
            ApiError::NotFound { .. } => "Not found",
        }
    }

    /// Label used for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::OriginNotAllowed(_) => "cors",
            ApiError::BadRequestBody(_) => "bad_body",
            ApiError::PayloadTooLarge { .. } => "body_too_large",
            ApiError::RateLimitExceeded => "rate_limit",
            ApiError::NotFound { .. } => "not_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_body_hides_detail() {
        let response = ApiError::OriginNotAllowed("https://evil.example".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text, r#"{"error":"Not allowed by CORS"}"#);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::BadRequestBody("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::NotFound { method: "GET".into(), path: "/x".into() }.status(),
            StatusCode::NOT_FOUND
        );
    }
}
