//! Route table.
//!
//! Routes live under a version prefix. Anything that does not match a path
//! and method exactly falls through to [`not_found`].

use axum::{
    http::{Method, Uri},
    routing::get,
    Router,
};

use crate::error::ApiError;
use crate::routing::liveness::liveness;

pub const API_V1: &str = "/api/v1";

/// Build the versioned route table.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(API_V1, get(liveness))
        .route(&format!("{API_V1}/"), get(liveness))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
}

/// Fallback for unmatched paths and methods.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    tracing::debug!(method = %method, path = %uri.path(), "No route matched");
    ApiError::NotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
