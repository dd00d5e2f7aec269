//! Error types for starting the connection server.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use super::ServerStatus;

/// Errors that leave the server in a terminal error state until the next
/// [`ConnectionServer::start`](super::ConnectionServer::start).
#[derive(Debug, Error)]
pub enum StartError {
    /// The listening socket could not be created.
    #[error("failed to create a listening socket: {source}")]
    Socket {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Non-blocking mode could not be enabled.
    #[error("failed to configure the listening socket: {source}")]
    Configure {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// `SO_REUSEADDR` could not be set.
    #[error("failed to enable address reuse: {source}")]
    ReuseAddress {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The address is taken or not local.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Requested listen address.
        address: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The bound socket refused to listen.
    #[error("failed to listen on {address}: {source}")]
    Listen {
        /// Requested listen address.
        address: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// A loop thread could not be started.
    #[error("failed to spawn the {role} loop thread: {source}")]
    Spawn {
        /// Which loop failed: `accept` or `scan`.
        role: &'static str,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

impl StartError {
    /// Status the server reports after this error.
    #[must_use]
    pub const fn status(&self) -> ServerStatus {
        match self {
            Self::Socket { .. } | Self::Configure { .. } | Self::Spawn { .. } => {
                ServerStatus::ErrInit
            }
            Self::ReuseAddress { .. } | Self::Bind { .. } => ServerStatus::ErrBind,
            Self::Listen { .. } => ServerStatus::ErrListen,
        }
    }
}
