//! Shared configuration for the key-space server and client.
//!
//! Values are resolved from command-line flags first, then `KEYSPACE_*`
//! environment variables, then the defaults in [`defaults`]. Every value
//! passes through the explicit parsers in [`parse`], so invalid input is
//! reported with a typed reason rather than a generic failure.

mod defaults;
mod logging;
mod parse;

use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser};
use thiserror::Error;

pub use defaults::{
    DEFAULT_CLIENT_HOST, DEFAULT_KEEPALIVE_COUNT, DEFAULT_KEEPALIVE_IDLE_SECS,
    DEFAULT_KEEPALIVE_INTERVAL_SECS, DEFAULT_LISTEN_ADDRESS, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    default_log_filter, default_log_format, default_thread_count,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use parse::{
    MAX_THREAD_COUNT, ParseError, parse_keepalive_value, parse_listen_address, parse_log_format,
    parse_port, parse_thread_count,
};

/// TCP keep-alive tuning applied to every accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args)]
pub struct KeepAliveConfig {
    /// Seconds a connection may idle before the first keep-alive packet.
    #[arg(
        long = "keepalive-idle",
        env = "KEYSPACE_KEEPALIVE_IDLE",
        default_value_t = DEFAULT_KEEPALIVE_IDLE_SECS,
        value_parser = parse_keepalive_value
    )]
    pub idle_secs: u32,
    /// Seconds between unanswered keep-alive packets.
    #[arg(
        long = "keepalive-interval",
        env = "KEYSPACE_KEEPALIVE_INTERVAL",
        default_value_t = DEFAULT_KEEPALIVE_INTERVAL_SECS,
        value_parser = parse_keepalive_value
    )]
    pub interval_secs: u32,
    /// Unanswered keep-alive packets before the connection is dropped.
    #[arg(
        long = "keepalive-count",
        env = "KEYSPACE_KEEPALIVE_COUNT",
        default_value_t = DEFAULT_KEEPALIVE_COUNT,
        value_parser = parse_keepalive_value
    )]
    pub count: u32,
}

impl KeepAliveConfig {
    /// Idle time as a [`Duration`].
    #[must_use]
    pub fn idle(&self) -> Duration {
        Duration::from_secs(u64::from(self.idle_secs))
    }

    /// Keep-alive interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_secs))
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            idle_secs: DEFAULT_KEEPALIVE_IDLE_SECS,
            interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
            count: DEFAULT_KEEPALIVE_COUNT,
        }
    }
}

/// Server configuration resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "keyspaced", about = "Hierarchical key-space store server")]
pub struct Config {
    /// Address the listening socket binds to.
    #[arg(
        long,
        env = "KEYSPACE_LISTEN_ADDRESS",
        default_value_t = DEFAULT_LISTEN_ADDRESS,
        value_parser = parse_listen_address
    )]
    pub listen_address: IpAddr,
    /// Port the listening socket binds to.
    #[arg(long, env = "KEYSPACE_PORT", default_value_t = DEFAULT_PORT, value_parser = parse_port)]
    pub port: u16,
    /// Number of worker threads in the job pool.
    #[arg(
        long,
        env = "KEYSPACE_THREADS",
        default_value_t = default_thread_count(),
        value_parser = parse_thread_count
    )]
    pub threads: usize,
    /// Keep-alive tuning for accepted connections.
    #[command(flatten)]
    pub keep_alive: KeepAliveConfig,
    /// Tracing filter expression.
    #[arg(long, env = "KEYSPACE_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format (`json` or `compact`).
    #[arg(
        long,
        env = "KEYSPACE_LOG_FORMAT",
        default_value_t = LogFormat::Json,
        value_parser = parse_log_format
    )]
    pub log_format: LogFormat,
    /// Reads operator commands from standard input.
    #[arg(long, env = "KEYSPACE_CONSOLE")]
    pub console: bool,
    /// Appends a `Request took N seconds.` line to every response.
    #[arg(long, env = "KEYSPACE_REPORT_TIMING")]
    pub report_timing: bool,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a flag or variable is rejected, or when
    /// `--help` or `--version` was requested.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the binary name, matching
    /// [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::from)
    }

    /// Socket address the server binds to.
    #[must_use]
    pub const fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.port)
    }

    /// Tracing filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS,
            port: DEFAULT_PORT,
            threads: default_thread_count(),
            keep_alive: KeepAliveConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            console: false,
            report_timing: false,
        }
    }
}

/// Client configuration for the `keyspace` binary.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "keyspace", about = "Interactive client for the key-space store")]
pub struct ClientConfig {
    /// Server address to connect to.
    #[arg(
        long,
        env = "KEYSPACE_HOST",
        default_value = DEFAULT_CLIENT_HOST,
        value_parser = parse_listen_address
    )]
    pub host: IpAddr,
    /// Server port to connect to.
    #[arg(long, env = "KEYSPACE_PORT", default_value_t = DEFAULT_PORT, value_parser = parse_port)]
    pub port: u16,
}

impl ClientConfig {
    /// Loads client configuration from an explicit argument list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for rejected input or a help request.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::from)
    }

    /// Socket address of the server.
    #[must_use]
    pub const fn server_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line or environment input was rejected.
    #[error(transparent)]
    Arguments(#[from] clap::Error),
}

impl ConfigError {
    /// Returns true when the user asked for `--help` or `--version`.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        let Self::Arguments(error) = self;
        matches!(
            error.kind(),
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
        )
    }

    /// Renders the message clap would print for this error.
    #[must_use]
    pub fn render(&self) -> String {
        let Self::Arguments(error) = self;
        error.render().to_string()
    }
}
