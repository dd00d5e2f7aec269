//! Interactive client for the key-space store.
//!
//! The binary delegates to [`keyspace_cli::run`], which resolves the server
//! address, relays stdin lines as request frames, and prints every response.

use std::io::{self, IsTerminal, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let prompt = io::stdin().is_terminal();
    let stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    keyspace_cli::run(
        std::env::args_os(),
        stdin,
        &mut stdout,
        &mut stderr,
        prompt,
    )
}
