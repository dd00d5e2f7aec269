use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroUsize;
use std::thread;

/// Default TCP port the server listens on and the client connects to.
pub const DEFAULT_PORT: u16 = 1111;

/// Default listen address: every IPv4 interface.
pub const DEFAULT_LISTEN_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default host the client connects to.
pub const DEFAULT_CLIENT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds of idleness before the first keep-alive packet.
pub const DEFAULT_KEEPALIVE_IDLE_SECS: u32 = 120;

/// Seconds between keep-alive packets.
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u32 = 3;

/// Unanswered keep-alive packets before the peer is considered gone.
pub const DEFAULT_KEEPALIVE_COUNT: u32 = 5;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Worker thread count matching the available hardware concurrency.
#[must_use]
pub fn default_thread_count() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
