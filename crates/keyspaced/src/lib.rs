//! Key-space store daemon.
//!
//! The daemon loads configuration from flags and `KEYSPACE_*` variables,
//! installs structured telemetry, and serves a single in-memory key space
//! over TCP. Each connected client sends text requests in length-prefixed
//! frames and receives one rendered outcome per request.
//!
//! Lifecycle events flow through a [`HealthReporter`] so operators can follow
//! bootstrap, server start-up, and client churn in the logs. With the
//! console enabled the daemon reads operator commands from standard input;
//! otherwise it runs until a termination signal arrives.

mod bootstrap;
mod console;
mod handler;
mod health;
mod process;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use console::{Console, ConsoleFlow};
pub use handler::{GREETING, StoreHandler};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
    run_daemon_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
