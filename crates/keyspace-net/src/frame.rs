//! Length-prefixed message framing shared by server peers and the client.
//!
//! A frame is an 8-byte little-endian payload length followed by the
//! payload. Text payloads carry a trailing NUL that the length includes.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::{debug, warn};

use crate::sockets::{self, Received, SocketCalls, SocketHandle};

const FRAME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::frame");

/// Bytes in the length prefix.
pub const PREFIX_BYTES: usize = 8;

/// Largest payload accepted before the connection is dropped.
pub const MAX_FRAME_BYTES: u64 = 1 << 20;

const READ_CHUNK: usize = 4096;

/// Encodes `text` as a NUL-terminated frame.
#[must_use]
#[expect(clippy::little_endian_bytes, reason = "wire format is little-endian")]
pub fn encode_frame(text: &str) -> Vec<u8> {
    let length = text.len() as u64 + 1;
    let mut frame = Vec::with_capacity(PREFIX_BYTES + text.len() + 1);
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(text.as_bytes());
    frame.push(0);
    frame
}

/// Decodes a text payload, dropping the NUL terminator.
#[must_use]
pub fn decode_text(payload: &[u8]) -> String {
    let text = payload
        .split(|byte| *byte == 0)
        .next()
        .unwrap_or_default();
    String::from_utf8_lossy(text).into_owned()
}

/// Errors raised while sending frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The connection was already closed.
    #[error("connection to {remote} is closed")]
    Closed {
        /// Peer address.
        remote: SocketAddr,
    },
    /// The socket rejected the frame; the connection is now closed.
    #[error("failed to send frame to {remote}: {source}")]
    Send {
        /// Peer address.
        remote: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
}

/// Whether a [`FramedConnection`] can still carry frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    /// Frames can flow.
    Connected,
    /// The socket has been released.
    Disconnected,
}

enum Extracted {
    Frame(Vec<u8>),
    Skipped,
    Incomplete,
    Oversized(u64),
}

/// A socket that sends and receives whole frames.
///
/// Receiving is non-blocking and buffered: partial prefixes and payloads
/// stay in the buffer until the rest arrives.
pub struct FramedConnection {
    sockets: Arc<dyn SocketCalls>,
    socket: SocketHandle,
    remote: SocketAddr,
    status: ConnectionStatus,
    buffer: Vec<u8>,
    max_frame: u64,
}

impl FramedConnection {
    /// Wraps an open socket with the default [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new(sockets: Arc<dyn SocketCalls>, socket: SocketHandle, remote: SocketAddr) -> Self {
        Self {
            sockets,
            socket,
            remote,
            status: ConnectionStatus::Connected,
            buffer: Vec::new(),
            max_frame: MAX_FRAME_BYTES,
        }
    }

    /// Overrides the payload limit.
    #[must_use]
    pub const fn with_max_frame(mut self, max_frame: u64) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Address of the peer.
    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Handle of the underlying socket.
    #[must_use]
    pub const fn socket(&self) -> SocketHandle {
        self.socket
    }

    /// Current connection status.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether frames can still be sent and received.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.status, ConnectionStatus::Connected)
    }

    /// Returns the next complete payload, or `None` when no whole frame is
    /// available yet. Check [`FramedConnection::status`] to tell a quiet
    /// connection from a closed one.
    pub fn receive_frame(&mut self) -> Option<Vec<u8>> {
        if !self.is_connected() {
            return None;
        }
        loop {
            match self.extract() {
                Extracted::Frame(payload) => return Some(payload),
                Extracted::Skipped => return None,
                Extracted::Oversized(length) => {
                    warn!(
                        target: FRAME_TARGET,
                        remote = %self.remote,
                        length,
                        max = self.max_frame,
                        "frame exceeds the size limit"
                    );
                    self.disconnect();
                    return None;
                }
                Extracted::Incomplete => {}
            }
            match self.sockets.receive(self.socket, READ_CHUNK, true) {
                Received::Data(bytes) => self.buffer.extend_from_slice(&bytes),
                Received::Again => return None,
                Received::Disconnected => {
                    self.disconnect();
                    return None;
                }
            }
        }
    }

    /// Receives the next frame and decodes it as text.
    pub fn receive_text(&mut self) -> Option<String> {
        self.receive_frame().map(|payload| decode_text(&payload))
    }

    /// Frames and sends `text`. A failed send closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Closed`] after a disconnect and
    /// [`FrameError::Send`] when the socket rejects the frame.
    pub fn send_text(&mut self, text: &str) -> Result<(), FrameError> {
        if !self.is_connected() {
            return Err(FrameError::Closed {
                remote: self.remote,
            });
        }
        if let Err(source) = self.sockets.send(self.socket, &encode_frame(text)) {
            self.disconnect();
            return Err(FrameError::Send {
                remote: self.remote,
                source,
            });
        }
        Ok(())
    }

    /// Shuts the socket down and releases it. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }
        self.status = ConnectionStatus::Disconnected;
        self.buffer.clear();
        sockets::discard(self.sockets.as_ref(), self.socket);
        debug!(
            target: FRAME_TARGET,
            remote = %self.remote,
            "connection closed"
        );
    }

    #[expect(clippy::little_endian_bytes, reason = "wire format is little-endian")]
    fn extract(&mut self) -> Extracted {
        let Some(prefix) = self.buffer.first_chunk::<PREFIX_BYTES>() else {
            return Extracted::Incomplete;
        };
        let length = u64::from_le_bytes(*prefix);
        if length == 0 {
            self.buffer.drain(..PREFIX_BYTES);
            return Extracted::Skipped;
        }
        if length > self.max_frame {
            return Extracted::Oversized(length);
        }
        let Ok(payload_len) = usize::try_from(length) else {
            return Extracted::Oversized(length);
        };
        let end = PREFIX_BYTES + payload_len;
        let Some(payload) = self.buffer.get(PREFIX_BYTES..end).map(<[u8]>::to_vec) else {
            return Extracted::Incomplete;
        };
        self.buffer.drain(..end);
        Extracted::Frame(payload)
    }
}

impl Drop for FramedConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
