//! Request admission pipeline.
//!
//! The stage order is fixed and declared once in [`ORDER`]. Each stage either
//! forwards the request to the next one or answers it with an
//! [`ApiError`](crate::error::ApiError). Route dispatch follows the last stage.
//!
//! ```text
//! CORS → JSON body → URL-encoded body → compression → security headers → rate limit → router
//! ```
//!
//! Responses travel back through the stages in reverse, so compression and
//! security headers also apply to rate limit and routing errors.

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;

use crate::config::AppConfig;
use crate::http::body::{self, BodyLimits};
use crate::security::cors::{self, CorsPolicy};
use crate::security::headers;
use crate::security::rate_limit::{self, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cors,
    JsonBody,
    UrlEncodedBody,
    Compression,
    SecurityHeaders,
    RateLimit,
}

/// Outermost first.
pub const ORDER: [Stage; 6] = [
    Stage::Cors,
    Stage::JsonBody,
    Stage::UrlEncodedBody,
    Stage::Compression,
    Stage::SecurityHeaders,
    Stage::RateLimit,
];

/// Shared components the stages need.
#[derive(Clone)]
pub struct PipelineState {
    pub cors: Arc<CorsPolicy>,
    pub body_limits: BodyLimits,
    pub security_headers: bool,
    pub limiter: Arc<RateLimiter>,
}

impl PipelineState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cors: Arc::new(CorsPolicy::new(config.environment.clone(), &config.cors)),
            body_limits: BodyLimits {
                max_bytes: config.security.max_body_size,
            },
            security_headers: config.security.enable_headers,
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
        }
    }
}

impl Stage {
    fn wrap(self, router: Router, state: &PipelineState) -> Router {
        match self {
            Stage::Cors => router
                .layer(cors::response_layer())
                .layer(middleware::from_fn_with_state(
                    state.cors.clone(),
                    cors::enforce_origin,
                )),
            Stage::JsonBody => router.layer(middleware::from_fn_with_state(
                state.body_limits,
                body::parse_json,
            )),
            Stage::UrlEncodedBody => router.layer(middleware::from_fn_with_state(
                state.body_limits,
                body::parse_urlencoded,
            )),
            Stage::Compression => router.layer(CompressionLayer::new()),
            Stage::SecurityHeaders => router.layer(middleware::from_fn_with_state(
                state.security_headers,
                headers::security_headers,
            )),
            Stage::RateLimit => router.layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit::enforce_rate_limit,
            )),
        }
    }
}

/// Wrap the route table in every stage of [`ORDER`].
///
/// `Router::layer` makes the most recently added layer the outermost, so the
/// stages are applied innermost first.
pub fn assemble(routes: Router, state: &PipelineState) -> Router {
    ORDER
        .iter()
        .rev()
        .fold(routes, |router, stage| stage.wrap(router, state))
}
