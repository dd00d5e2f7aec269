//! Entry point for the key-space store daemon.
//!
//! Delegates to [`keyspaced::run_daemon`], which loads configuration,
//! installs telemetry, starts the connection server, and blocks until the
//! operator console exits or a termination signal arrives.

use std::io::{self, Write};
use std::process::ExitCode;

use keyspaced::{BootstrapError, LaunchError};

fn main() -> ExitCode {
    match keyspaced::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(LaunchError::Bootstrap {
            source: BootstrapError::Configuration { source },
        }) if source.is_informational() => {
            let _ = write!(io::stdout(), "{}", source.render());
            ExitCode::SUCCESS
        }
        Err(LaunchError::Bootstrap {
            source: BootstrapError::Configuration { source },
        }) => {
            let _ = write!(io::stderr(), "{}", source.render());
            ExitCode::FAILURE
        }
        Err(error) => {
            let _ = writeln!(io::stderr(), "keyspaced: {error}");
            ExitCode::from(error.exit_status())
        }
    }
}
