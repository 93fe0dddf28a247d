//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use api_frontdoor::config::{AppConfig, Environment};
use api_frontdoor::HttpServer;

pub const ALLOWED_ORIGIN: &str = "https://docs.example.com";

/// Production-like configuration with one allowed origin, bound to loopback.
pub fn test_config(environment: Environment) -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = environment;
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.cors.allowed_origins = vec![ALLOWED_ORIGIN.to_string()];
    config.lifecycle.shutdown_grace_secs = 5;
    config
}

pub fn app(config: AppConfig) -> Router {
    HttpServer::new(config).router()
}

/// Request builder that looks like it arrived from `client_ip`.
pub fn request(method: Method, uri: &str, client_ip: [u8; 4]) -> RequestSpec {
    RequestSpec {
        builder: Request::builder().method(method).uri(uri),
        client: SocketAddr::from((client_ip, 40000)),
    }
}

pub struct RequestSpec {
    builder: axum::http::request::Builder,
    client: SocketAddr,
}

impl RequestSpec {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn body(self, body: impl Into<Body>) -> Request<Body> {
        let mut request = self.builder.body(body.into()).unwrap();
        request.extensions_mut().insert(ConnectInfo(self.client));
        request
    }

    pub fn empty(self) -> Request<Body> {
        self.body(Body::empty())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
