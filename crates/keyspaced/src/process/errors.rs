//! Error surface for daemon launch and supervision.

use std::io;

use thiserror::Error;

use keyspace_net::{ServerStatus, StartError};

use crate::bootstrap::BootstrapError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or running the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Bootstrap failure.
        #[source]
        source: BootstrapError,
    },
    /// The connection server could not start. `explanation` is the server's
    /// status description.
    #[error("{explanation}")]
    Server {
        /// Start failure.
        #[source]
        source: StartError,
        /// Text from [`keyspace_net::ConnectionServer::explain_status`].
        explanation: String,
    },
    /// Waiting for a shutdown signal failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Signal listener failure.
        #[source]
        source: ShutdownError,
    },
    /// Reading or writing the operator console failed.
    #[error("operator console failed: {source}")]
    Console {
        /// Stream error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Server { source, .. } => match source.status() {
                ServerStatus::ErrBind => 3,
                ServerStatus::ErrListen => 4,
                _ => 2,
            },
            Self::Bootstrap { .. } | Self::Shutdown { .. } | Self::Console { .. } => 1,
        }
    }
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
