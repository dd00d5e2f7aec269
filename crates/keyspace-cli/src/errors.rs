//! Error types for the client runtime.

use std::io;
use std::net::SocketAddr;

use keyspace_config::ConfigError;
use keyspace_net::FrameError;
use thiserror::Error;

/// Failures surfaced by the client runtime.
#[derive(Debug, Error)]
pub enum AppError {
    /// Arguments or environment were rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    /// The server could not be reached.
    #[error("couldn't connect to the server at {address}: {source}")]
    Connect {
        /// Server address that was tried.
        address: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },
    /// A request frame could not be written.
    #[error("failed to send request: {0}")]
    Send(#[from] FrameError),
    /// Waiting for readability failed.
    #[error("failed to wait for a response: {0}")]
    Receive(io::Error),
    /// The input stream failed.
    #[error("failed to read input: {0}")]
    ReadInput(io::Error),
    /// The output stream failed.
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// True when the server was not accepting connections.
    #[must_use]
    pub fn is_server_unavailable(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
