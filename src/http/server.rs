//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the versioned routes
//! - Wrap it in the admission pipeline
//! - Wire up ambient middleware (request ID, tracing, metrics, timeout)
//! - Serve on a bound listener until shutdown is broadcast

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, middleware, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::pipeline::{self, PipelineState};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing;
use crate::security::rate_limit::RateLimiter;

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
    state: PipelineState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let state = PipelineState::from_config(&config);
        let router = Self::build_router(&config, &state);
        Self {
            router,
            config: Arc::new(config),
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: &PipelineState) -> Router {
        pipeline::assemble(routing::routes(), state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = request_id(request).unwrap_or_default(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered application, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Limiter shared by every clone of the router.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.state.limiter.clone()
    }

    /// Serve on `listener` until `shutdown` is triggered, then drain.
    ///
    /// Subscribes to `shutdown` before returning, so a trigger that races the
    /// first poll of the returned future is not lost.
    pub fn run(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
    ) -> impl Future<Output = Result<(), std::io::Error>> + Send + 'static {
        let mut serve_shutdown = shutdown.subscribe();
        let sweeper_shutdown = shutdown.subscribe();

        async move {
            let addr = listener.local_addr()?;
            tracing::info!(
                address = %addr,
                environment = %self.config.environment,
                "HTTP server starting"
            );

            let sweeper = self.state.limiter.clone().spawn_sweeper(
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
                sweeper_shutdown,
            );

            let app = self
                .router
                .into_make_service_with_connect_info::<SocketAddr>();

            // Serve with graceful shutdown
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = serve_shutdown.recv().await;
                })
                .await?;

            if let Err(e) = sweeper.await {
                tracing::warn!(error = %e, "Rate limit sweeper ended abnormally");
            }

            tracing::info!("HTTP server stopped");
            Ok(())
        }
    }
}
