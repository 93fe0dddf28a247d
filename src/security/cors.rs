//! Cross-origin admission.
//!
//! Two pieces sit at the CORS stage of the pipeline:
//! - [`enforce_origin`] rejects requests whose `Origin` is not admitted by
//!   the [`CorsPolicy`] before any other work is done
//! - [`response_layer`] answers preflights and echoes admitted origins in
//!   `Access-Control-Allow-Origin`
//!
//! Rejected requests never reach the response layer, so they carry no
//! permissive CORS header.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Environment};
use crate::error::ApiError;
use crate::observability::metrics;

/// Why a request was admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No `Origin` header: same-origin or non-browser client.
    NoOrigin,
    /// Development mode admits every origin.
    Development,
    /// Origin found in the allow-list.
    Listed,
}

/// Origin policy built once from configuration.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    environment: Environment,
    allowed_origins: HashSet<String>,
}

impl CorsPolicy {
    /// Expects origins already normalized by the config loader.
    pub fn new(environment: Environment, config: &CorsConfig) -> Self {
        Self {
            environment,
            allowed_origins: config.allowed_origins.iter().cloned().collect(),
        }
    }

    pub fn check(&self, origin: Option<&str>) -> Result<Admission, ApiError> {
        if self.environment.is_development() {
            return Ok(Admission::Development);
        }
        match origin {
            None => Ok(Admission::NoOrigin),
            Some(origin) if self.allowed_origins.contains(origin) => Ok(Admission::Listed),
            Some(origin) => Err(ApiError::OriginNotAllowed(origin.to_string())),
        }
    }
}

/// Middleware rejecting disallowed origins with 403.
pub async fn enforce_origin(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match policy.check(origin.as_deref()) {
        Ok(admission) => {
            tracing::trace!(origin = ?origin, admission = ?admission, "Origin admitted");
            next.run(request).await
        }
        Err(error) => {
            tracing::warn!(
                origin = origin.as_deref().unwrap_or_default(),
                "CORS error: origin is not allowed"
            );
            metrics::record_rejection(&error);
            error.into_response()
        }
    }
}

/// Header handling for admitted requests.
pub fn response_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}
