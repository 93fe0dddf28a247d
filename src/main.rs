//! API front door (v1)
//!
//! A single-process HTTP API scaffold built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                     API FRONT DOOR                        │
//!                     │                                                           │
//!   Client Request    │  ┌──────┐   ┌──────┐   ┌──────┐   ┌─────────┐   ┌──────┐ │
//!   ──────────────────┼─▶│ CORS │──▶│ body │──▶│ gzip │──▶│ headers │──▶│ rate │─┼─┐
//!                     │  └──────┘   └──────┘   └──────┘   └─────────┘   └──────┘ │ │
//!                     │                                                           │ │
//!   Client Response   │                      ┌──────────────────────┐             │ │
//!   ◀─────────────────┼──────────────────────│ routing: GET /api/v1 │◀────────────┼─┘
//!                     │                      └──────────────────────┘             │
//!                     │                                                           │
//!                     │  ┌─────────────────────────────────────────────────────┐ │
//!                     │  │               Cross-Cutting Concerns                 │ │
//!                     │  │  ┌────────┐  ┌──────────────┐  ┌─────────────────┐  │ │
//!                     │  │  │ config │  │observability │  │    lifecycle    │  │ │
//!                     │  │  │        │  │ logs/metrics │  │startup/shutdown │  │ │
//!                     │  │  └────────┘  └──────────────┘  └─────────────────┘  │ │
//!                     │  └─────────────────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use api_frontdoor::config::load_config;
use api_frontdoor::lifecycle::{self, Startup};
use api_frontdoor::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "api-frontdoor", version)]
#[command(about = "Minimal HTTP API front door", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port, overriding PORT and the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from this file, so it is not up yet.
            eprintln!("api-frontdoor: invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    logging::init(&config.observability, &config.environment);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        port = config.server.port,
        allowed_origins = config.cors.allowed_origins.len(),
        rate_limit = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated by the loader.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let status = lifecycle::run(Startup::new(config)).await;
    ExitCode::from(status)
}
