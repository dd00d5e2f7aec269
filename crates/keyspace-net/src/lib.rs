//! Connection engine for the key-space store.
//!
//! The crate provides the pieces the daemon and the client share:
//!
//! - [`sockets`]: socket primitives behind the [`SocketCalls`] trait.
//! - [`frame`]: length-prefixed framing over a socket.
//! - [`pool`]: the worker pool that runs request and disconnect jobs.
//! - [`server`]: the accept/dispatch engine and its peer registry.
//!
//! The `test-support` feature exposes a scriptable socket layer for crates
//! that build on [`SocketCalls`].

pub mod frame;
pub mod pool;
pub mod server;
pub mod sockets;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

pub use self::frame::{
    ConnectionStatus, FrameError, FramedConnection, MAX_FRAME_BYTES, decode_text, encode_frame,
};
pub use self::pool::JobPool;
pub use self::server::{ConnectionServer, PeerHandler, ServerOptions, ServerStatus, StartError};
pub use self::sockets::{
    AddressFamily, Received, SocketCalls, SocketHandle, SocketOption, SystemSockets,
};

/// Token a client sends to ask the server to close its connection.
pub const DISCONNECT_TOKEN: &str = "$dscn";
