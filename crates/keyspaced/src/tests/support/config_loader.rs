//! Configuration loaders for success and failure paths.

use std::net::{IpAddr, Ipv4Addr};

use keyspace_config::{Config, ConfigError};

use crate::bootstrap::ConfigLoader;

/// Loopback configuration on an ephemeral port with a small pool.
#[must_use]
pub fn loopback_config() -> Config {
    Config {
        listen_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        threads: 2,
        ..Config::default()
    }
}

/// Loader that fails by passing an invalid port.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_iter(["keyspaced", "--port", "not-a-port"])
    }
}
