//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;

use keyspace_config::Config;
use keyspace_net::StartError;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events, implemented by telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the server accepts connections.
    fn server_started(&self, address: SocketAddr, threads: usize);

    /// Invoked when the server cannot start. `explanation` is the server's
    /// own status description.
    fn server_failed(&self, error: &StartError, explanation: &str);

    /// Invoked when a client is admitted.
    fn peer_connected(&self, remote: SocketAddr);

    /// Invoked once per client after its connection closes.
    fn peer_disconnected(&self, remote: SocketAddr);
}

/// Reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Creates a reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            address = %config.socket_address(),
            threads = config.threads,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            console = config.console,
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn server_started(&self, address: SocketAddr, threads: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_started",
            %address,
            threads,
            "key-space store is accepting connections"
        );
    }

    fn server_failed(&self, error: &StartError, explanation: &str) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "server_failed",
            status = %error.status(),
            error = %error,
            explanation,
            "server failed to start"
        );
    }

    fn peer_connected(&self, remote: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_connected",
            %remote,
            "client connected"
        );
    }

    fn peer_disconnected(&self, remote: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_disconnected",
            %remote,
            "client disconnected"
        );
    }
}
