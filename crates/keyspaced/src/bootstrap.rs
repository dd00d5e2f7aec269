//! Daemon bootstrap orchestration.

use std::sync::Arc;

use thiserror::Error;

use keyspace_config::{Config, ConfigError};
use keyspace_net::{ConnectionServer, PeerHandler, ServerOptions};
use keyspace_tree::KeySpaceNode;

use crate::handler::StoreHandler;
use crate::health::HealthReporter;
use crate::process::LaunchError;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Abstraction over configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for rejected input or a help request.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that reads process arguments and the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Rejected input or a help request.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Subscriber set-up failure.
        #[source]
        source: TelemetryError,
    },
}

/// A bootstrapped daemon: configuration, telemetry, and an empty key space.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    root: Arc<KeySpaceNode>,
}

impl Daemon {
    /// Configuration the daemon was bootstrapped with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Proof that telemetry is installed.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Root of the key space served by this daemon.
    #[must_use]
    pub const fn root(&self) -> &Arc<KeySpaceNode> {
        &self.root
    }

    /// Builds the connection server over `options` and starts it.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Server`] carrying the server's status
    /// explanation when the listening socket cannot be opened.
    pub fn serve(&self, options: ServerOptions) -> Result<ConnectionServer, LaunchError> {
        let handler: Arc<dyn PeerHandler> = Arc::new(
            StoreHandler::new(Arc::clone(&self.root), Arc::clone(&self.reporter))
                .with_request_timing(self.config.report_timing),
        );
        let server = ConnectionServer::system(options, handler);
        if let Err(source) = server.start() {
            let explanation = server.explain_status();
            self.reporter.server_failed(&source, &explanation);
            return Err(LaunchError::Server {
                source,
                explanation,
            });
        }
        self.reporter
            .server_started(server.local_addr(), server.thread_pool().thread_count());
        Ok(server)
    }

    /// Starts the server with the options from the loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`Daemon::serve`].
    pub fn serve_configured(&self) -> Result<ConnectionServer, LaunchError> {
        self.serve(ServerOptions::from_config(&self.config))
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration or telemetry fails; the
/// reporter has already been told.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        telemetry,
        reporter,
        root: KeySpaceNode::root(),
    })
}
