//! Shared doubles for the daemon test suites.

mod client;
mod config_loader;
mod reporter;

pub use client::StoreClient;
pub use config_loader::{FailingConfigLoader, loopback_config};
pub use reporter::{HealthEvent, RecordingHealthReporter};
