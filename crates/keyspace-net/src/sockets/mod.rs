//! Socket primitives consumed by the server and the client.
//!
//! Everything above this module talks to sockets through [`SocketCalls`],
//! which hands out opaque [`SocketHandle`] tokens. [`SystemSockets`] backs
//! the trait with `socket2`; tests substitute a `mockall` double.
//!
//! Platform socket-library setup is performed lazily by `socket2` and the
//! standard library, so there is no process-wide init or teardown step.

mod system;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use keyspace_config::KeepAliveConfig;
use tracing::debug;

pub use self::system::{SEND_TIMEOUT, SystemSockets};

const SOCKETS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sockets");

/// Opaque token naming a socket owned by a [`SocketCalls`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Wraps a raw token.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address family of a new socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl AddressFamily {
    /// Family matching `address`.
    #[must_use]
    pub const fn of(address: &SocketAddr) -> Self {
        match address {
            SocketAddr::V4(_) => Self::V4,
            SocketAddr::V6(_) => Self::V6,
        }
    }
}

/// Options applied through [`SocketCalls::set_option`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOption {
    /// `SO_REUSEADDR`, so a restarted server can rebind at once.
    ReuseAddress,
    /// Switches between blocking and non-blocking mode.
    NonBlocking(bool),
    /// Enables TCP keep-alive with the given tuning.
    KeepAlive(KeepAliveConfig),
    /// Bounds blocking reads.
    ReadTimeout(Duration),
}

/// Result of a single receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Bytes read from the peer; never empty.
    Data(Vec<u8>),
    /// Nothing is available right now; the connection is still open.
    Again,
    /// The peer closed the connection or the socket failed.
    Disconnected,
}

/// Socket primitives used by the connection engine.
pub trait SocketCalls: Send + Sync + 'static {
    /// Opens a TCP stream socket.
    fn new_socket(&self, family: AddressFamily) -> io::Result<SocketHandle>;

    /// Applies one option.
    fn set_option(&self, socket: SocketHandle, option: SocketOption) -> io::Result<()>;

    /// Binds to a local address.
    fn bind(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()>;

    /// Starts listening with the given backlog.
    fn listen(&self, socket: SocketHandle, backlog: i32) -> io::Result<()>;

    /// Accepts one pending connection, or `None` when none is waiting.
    fn accept(&self, socket: SocketHandle) -> io::Result<Option<(SocketHandle, SocketAddr)>>;

    /// Connects to a remote address.
    fn connect(&self, socket: SocketHandle, address: SocketAddr) -> io::Result<()>;

    /// Sends the whole buffer. Implementations give up with
    /// [`io::ErrorKind::TimedOut`] when the peer stops draining it.
    fn send(&self, socket: SocketHandle, bytes: &[u8]) -> io::Result<()>;

    /// Reads at most `max` bytes.
    fn receive(&self, socket: SocketHandle, max: usize, nonblocking: bool) -> Received;

    /// Shuts down both directions.
    fn shutdown(&self, socket: SocketHandle) -> io::Result<()>;

    /// Releases the handle. Unknown handles are ignored.
    fn close(&self, socket: SocketHandle);

    /// Waits up to `timeout` for the socket to become readable.
    fn poll_readable(&self, socket: SocketHandle, timeout: Duration) -> io::Result<bool>;

    /// Address the socket is bound to.
    fn local_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr>;

    /// Address of the connected peer.
    fn peer_addr(&self, socket: SocketHandle) -> io::Result<SocketAddr>;
}

/// Shuts `socket` down and closes it, logging rather than returning errors.
pub(crate) fn discard(sockets: &dyn SocketCalls, socket: SocketHandle) {
    if let Err(error) = sockets.shutdown(socket) {
        debug!(
            target: SOCKETS_TARGET,
            %socket,
            error = %error,
            "socket shutdown failed"
        );
    }
    sockets.close(socket);
}
