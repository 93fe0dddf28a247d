//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Await dependencies → Bind listener → Serve
//!     failure → exit 1 in production, otherwise stay up until signalled
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → Stop accepting → Drain connections → Stop background tasks → Exit
//! ```
//!
//! # Design Decisions
//! - Listener opens last (traffic only when ready)
//! - Shutdown has a grace period; overrunning it counts as a cleanup failure
//! - Cleanup failures exit 0 unless configured otherwise

pub mod shutdown;
pub mod signals;
pub mod startup;

use std::future::Future;

pub use shutdown::{Shutdown, ShutdownOutcome, ShutdownPolicy};
pub use startup::{on_failure, FailureAction, Started, Startup, StartupError};

/// Run the server until SIGTERM/SIGINT. Returns the process exit status.
pub async fn run(startup: Startup) -> u8 {
    run_until(startup, signals::wait_for_termination()).await
}

/// Run the server until `termination` resolves. Returns the process exit status.
pub async fn run_until<F>(startup: Startup, termination: F) -> u8
where
    F: Future,
{
    let environment = startup.config().environment.clone();
    let policy = ShutdownPolicy::from_config(&startup.config().lifecycle);

    let started = match startup.start().await {
        Ok(started) => started,
        Err(error) => {
            tracing::error!(error = %error, environment = %environment, "Startup failed");
            return match on_failure(&environment) {
                FailureAction::Exit(status) => status,
                FailureAction::StayAlive => {
                    tracing::warn!(
                        "Staying up without a listener for diagnosis; send SIGTERM to exit"
                    );
                    termination.await;
                    0
                }
            };
        }
    };

    let outcome = serve_until(started, policy, termination).await;
    policy.exit_status(&outcome)
}

/// Serve until `termination` resolves, then shut down within the grace period.
pub async fn serve_until<F>(
    started: Started,
    policy: ShutdownPolicy,
    termination: F,
) -> ShutdownOutcome
where
    F: Future,
{
    let shutdown = Shutdown::new();
    let mut server = tokio::spawn(started.server.run(started.listener, &shutdown));

    tokio::select! {
        _ = termination => {}
        result = &mut server => {
            let reason = match result {
                Ok(Ok(())) => "server stopped unexpectedly".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("server task failed: {e}"),
            };
            tracing::error!(reason = %reason, "HTTP server exited before shutdown was requested");
            return ShutdownOutcome::CleanupFailed(reason);
        }
    }

    tracing::info!(grace_secs = policy.grace_period.as_secs(), "Draining connections");
    shutdown.trigger();

    let outcome = match tokio::time::timeout(policy.grace_period, &mut server).await {
        Ok(Ok(Ok(()))) => ShutdownOutcome::Clean,
        Ok(Ok(Err(e))) => ShutdownOutcome::CleanupFailed(e.to_string()),
        Ok(Err(e)) => ShutdownOutcome::CleanupFailed(format!("server task failed: {e}")),
        Err(_) => {
            server.abort();
            ShutdownOutcome::CleanupFailed(
                "grace period elapsed with connections still open".into(),
            )
        }
    };

    match &outcome {
        ShutdownOutcome::Clean => tracing::info!("Shutdown complete"),
        ShutdownOutcome::CleanupFailed(reason) => {
            tracing::error!(reason = %reason, "Shutdown cleanup failed")
        }
    }
    outcome
}
