//! Bridges framed peer traffic to the key-space tree.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use keyspace_net::{DISCONNECT_TOKEN, FramedConnection, PeerHandler, decode_text};
use keyspace_tree::KeySpaceNode;

use crate::health::HealthReporter;

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handler");

/// Frame sent to every peer as soon as it is admitted.
pub const GREETING: &str = "info: Welcome! Key-space store is active.";

/// Answers each request frame with the rendered outcome from the root node.
pub struct StoreHandler {
    root: Arc<KeySpaceNode>,
    reporter: Arc<dyn HealthReporter>,
    report_timing: bool,
}

impl StoreHandler {
    /// Creates a handler answering from `root` and reporting peer churn.
    #[must_use]
    pub fn new(root: Arc<KeySpaceNode>, reporter: Arc<dyn HealthReporter>) -> Self {
        Self {
            root,
            reporter,
            report_timing: false,
        }
    }

    /// Appends the request duration to every response when `enabled`.
    #[must_use]
    pub const fn with_request_timing(mut self, enabled: bool) -> Self {
        self.report_timing = enabled;
        self
    }

    fn reply(peer: &mut FramedConnection, text: &str) {
        if let Err(error) = peer.send_text(text) {
            warn!(
                target: HANDLER_TARGET,
                remote = %peer.remote_addr(),
                error = %error,
                "failed to answer peer"
            );
        }
    }
}

impl PeerHandler for StoreHandler {
    fn on_connect(&self, peer: &mut FramedConnection) {
        self.reporter.peer_connected(peer.remote_addr());
        Self::reply(peer, GREETING);
    }

    fn on_data(&self, payload: &[u8], peer: &mut FramedConnection) {
        let request = decode_text(payload);
        if request == DISCONNECT_TOKEN {
            debug!(
                target: HANDLER_TARGET,
                remote = %peer.remote_addr(),
                "peer asked to disconnect"
            );
            peer.disconnect();
            return;
        }
        let started = Instant::now();
        let rendered = self.root.handle_request(&request).render();
        if self.report_timing {
            Self::reply(peer, &with_timing(&rendered, started.elapsed()));
        } else {
            Self::reply(peer, &rendered);
        }
    }

    fn on_disconnect(&self, peer: &FramedConnection) {
        self.reporter.peer_disconnected(peer.remote_addr());
    }
}

fn with_timing(rendered: &str, elapsed: Duration) -> String {
    format!("{rendered}\nRequest took {:.3} seconds.", elapsed.as_secs_f64())
}
