//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level at startup
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{Environment, LogFormat, ObservabilityConfig};

/// Pick the output format: explicit setting first, then the environment.
pub fn resolve_format(config: &ObservabilityConfig, environment: &Environment) -> LogFormat {
    match config.log_format {
        Some(format) => format,
        None if environment.is_development() => LogFormat::Pretty,
        None => LogFormat::Json,
    }
}

fn filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "api_frontdoor={level},tower_http={level}",
            level = config.log_level
        ))
    })
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init(config: &ObservabilityConfig, environment: &Environment) -> bool {
    let registry = tracing_subscriber::registry().with(filter(config));

    let result = match resolve_format(config, environment) {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    result.is_ok()
}
