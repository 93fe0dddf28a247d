//! Shutdown coordination.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::schema::LifecycleConfig;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How shutdown ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Connections drained and background tasks stopped in time.
    Clean,
    /// Draining failed or overran the grace period.
    CleanupFailed(String),
}

/// Shutdown timing and exit status rules.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownPolicy {
    pub grace_period: Duration,
    pub exit_nonzero_on_cleanup_failure: bool,
}

impl ShutdownPolicy {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            grace_period: Duration::from_secs(config.shutdown_grace_secs),
            exit_nonzero_on_cleanup_failure: config.exit_nonzero_on_cleanup_failure,
        }
    }

    /// Process exit status for a shutdown outcome.
    pub fn exit_status(&self, outcome: &ShutdownOutcome) -> u8 {
        match outcome {
            ShutdownOutcome::Clean => 0,
            ShutdownOutcome::CleanupFailed(_) if self.exit_nonzero_on_cleanup_failure => 1,
            ShutdownOutcome::CleanupFailed(_) => 0,
        }
    }
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::from_config(&LifecycleConfig::default())
    }
}
