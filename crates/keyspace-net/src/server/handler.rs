//! Callbacks the server invokes for each peer.

use crate::frame::FramedConnection;

/// Reacts to peer lifecycle events.
///
/// Each callback runs with exclusive access to the peer's connection.
/// `on_data` runs on a pool worker and at most once at a time per peer;
/// implementations answer through `peer` and should avoid panicking.
pub trait PeerHandler: Send + Sync + 'static {
    /// Runs once when a peer is admitted, before it is registered.
    fn on_connect(&self, peer: &mut FramedConnection);

    /// Handles one complete frame payload.
    fn on_data(&self, payload: &[u8], peer: &mut FramedConnection);

    /// Runs exactly once after the peer's disconnect has been observed.
    fn on_disconnect(&self, peer: &FramedConnection);
}
