//! [`HealthReporter`] double that records events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use keyspace_config::Config;
use keyspace_net::StartError;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerStarted(SocketAddr),
    ServerFailed(String),
    PeerConnected(SocketAddr),
    PeerDisconnected(SocketAddr),
}

#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn count(&self, matches: impl Fn(&HealthEvent) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_started(&self, address: SocketAddr, _threads: usize) {
        self.record(HealthEvent::ServerStarted(address));
    }

    fn server_failed(&self, _error: &StartError, explanation: &str) {
        self.record(HealthEvent::ServerFailed(explanation.to_owned()));
    }

    fn peer_connected(&self, remote: SocketAddr) {
        self.record(HealthEvent::PeerConnected(remote));
    }

    fn peer_disconnected(&self, remote: SocketAddr) {
        self.record(HealthEvent::PeerDisconnected(remote));
    }
}
