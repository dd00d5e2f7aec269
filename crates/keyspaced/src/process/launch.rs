//! Launch sequencing for the daemon runtime.

use std::io::{self, BufRead, IsTerminal, Stdin, StdinLock, Stdout, Write};
use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::console::Console;
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the daemon.
///
/// `console_input` and `console_output` are only used when the loaded
/// configuration enables the operator console; otherwise the daemon blocks on
/// `shutdown`.
pub struct LaunchPlan<L, S, R, W> {
    /// Source of the daemon configuration.
    pub loader: L,
    /// Sink for lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
    /// Blocks until the daemon should stop when the console is off.
    pub shutdown: S,
    /// Operator commands.
    pub console_input: R,
    /// Console replies.
    pub console_output: W,
    /// Writes a `>> ` prompt before each console read.
    pub prompt: bool,
}

impl LaunchPlan<SystemConfigLoader, SystemShutdownSignal, StdinLock<'static>, Stdout> {
    /// Production collaborators: process arguments, `tracing` health events,
    /// termination signals, and the standard streams.
    #[must_use]
    pub fn system() -> Self {
        let stdin: Stdin = io::stdin();
        let prompt = stdin.is_terminal();
        Self {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            shutdown: SystemShutdownSignal,
            console_input: stdin.lock(),
            console_output: io::stdout(),
            prompt,
        }
    }
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// See [`run_daemon_with`].
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan::system())
}

/// Runs the daemon with injected collaborators.
///
/// Bootstraps, starts the server, waits for the console to exit or for a
/// shutdown signal, then stops the server.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap or server start-up fails, when the
/// console streams fail, or when the shutdown listener cannot be installed.
/// The server is stopped before a console or shutdown error is returned.
pub fn run_daemon_with<L, S, R, W>(plan: LaunchPlan<L, S, R, W>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
    R: BufRead,
    W: Write,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        console_input,
        mut console_output,
        prompt,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter)?;
    let server = daemon.serve_configured()?;
    let console = daemon.config().console;
    info!(
        target: PROCESS_TARGET,
        console,
        "daemon running"
    );

    let waited = if console {
        Console::new(&server, daemon.root())
            .run(console_input, &mut console_output, prompt)
            .map_err(|source| LaunchError::Console { source })
    } else {
        shutdown.wait().map_err(LaunchError::from)
    };

    server.stop();
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    waited
}
