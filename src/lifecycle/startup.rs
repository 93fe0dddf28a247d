//! Startup orchestration.
//!
//! # Responsibilities
//! - Await registered startup dependencies, in registration order
//! - Bind the listener only once every dependency is ready
//! - Decide what a startup failure means for the process
//!
//! # Design Decisions
//! - Fail fast in production: any startup error exits with status 1
//! - Elsewhere the process stays up for diagnosis until signalled

use std::future::Future;
use std::net::SocketAddr;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::net::TcpListener;

use crate::config::{AppConfig, Environment};
use crate::http::HttpServer;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("startup dependency {name} failed: {source}")]
    Dependency { name: String, source: BoxError },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
}

/// What the process does after a startup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    Exit(u8),
    StayAlive,
}

pub fn on_failure(environment: &Environment) -> FailureAction {
    if environment.is_production() {
        FailureAction::Exit(1)
    } else {
        FailureAction::StayAlive
    }
}

struct Dependency {
    name: String,
    ready: BoxFuture<'static, Result<(), BoxError>>,
}

/// Builder for a server start: configuration plus dependencies to await.
pub struct Startup {
    config: AppConfig,
    dependencies: Vec<Dependency>,
}

impl Startup {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            dependencies: Vec::new(),
        }
    }

    /// Register a dependency (database, cache, ...) that must resolve before
    /// the listener opens.
    pub fn depends_on<F>(mut self, name: impl Into<String>, ready: F) -> Self
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.dependencies.push(Dependency {
            name: name.into(),
            ready: ready.boxed(),
        });
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Await dependencies, then bind the listener.
    pub async fn start(self) -> Result<Started, StartupError> {
        for Dependency { name, ready } in self.dependencies {
            tracing::info!(dependency = %name, "Waiting for startup dependency");
            ready
                .await
                .map_err(|source| StartupError::Dependency {
                    name: name.clone(),
                    source,
                })?;
            tracing::info!(dependency = %name, "Startup dependency ready");
        }

        let cors = &self.config.cors;
        if self.config.environment.is_production() && cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured in production; cross-origin requests fail");
        }

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;

        let server = HttpServer::new(self.config);
        Ok(Started { server, listener })
    }
}

/// A bound listener and the server that will serve it.
pub struct Started {
    pub server: HttpServer,
    pub listener: TcpListener,
}

impl Started {
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config
    }

    #[test]
    fn test_failure_action_by_environment() {
        assert_eq!(on_failure(&Environment::Production), FailureAction::Exit(1));
        assert_eq!(on_failure(&Environment::Development), FailureAction::StayAlive);
        assert_eq!(on_failure(&Environment::default()), FailureAction::StayAlive);
    }

    #[tokio::test]
    async fn test_binds_after_dependencies() {
        let started = Startup::new(local_config())
            .depends_on("database", async { Ok(()) })
            .start()
            .await
            .unwrap();
        assert_ne!(started.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_dependency_failure_aborts_start() {
        let err = Startup::new(local_config())
            .depends_on("database", async { Err::<(), BoxError>("connection refused".into()) })
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::Dependency { ref name, .. } if name == "database"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = local_config();
        config.server.port = taken.local_addr().unwrap().port();

        let err = Startup::new(config).start().await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
