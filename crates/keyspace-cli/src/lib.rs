//! Client runtime for the key-space store.
//!
//! [`run`] resolves the server address from arguments and environment,
//! connects, and then alternates between printing a response frame and
//! sending the next line read from the input. The runtime takes its streams
//! as parameters so tests can drive whole sessions in memory.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use keyspace_config::ClientConfig;
use keyspace_net::DISCONNECT_TOKEN;

mod errors;
mod transport;

pub use errors::AppError;
pub use transport::Session;

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];
const PROMPT: &str = ">> ";

/// Runs the client with the provided arguments and streams.
///
/// `prompt` writes `>> ` before each input line is read.
#[must_use]
pub fn run<I, T, R, W, E>(
    args: I,
    input: R,
    stdout: &mut W,
    stderr: &mut E,
    prompt: bool,
) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    R: BufRead,
    W: Write,
    E: Write,
{
    let config = match ClientConfig::load_from_iter(args) {
        Ok(config) => config,
        Err(error) if error.is_informational() => {
            let _ = write!(stdout, "{}", error.render());
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{}", error.render());
            return ExitCode::FAILURE;
        }
    };

    match run_session(&config, input, stdout, prompt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "keyspace: {error}");
            if error.is_server_unavailable() {
                let _ = writeln!(
                    stderr,
                    "Is keyspaced listening on {}?",
                    config.server_address()
                );
            }
            ExitCode::FAILURE
        }
    }
}

/// Connects to the configured server and relays `input` until it ends, the
/// user exits, or the server closes the connection.
///
/// # Errors
///
/// Returns [`AppError`] when the connection fails or a stream breaks.
pub fn run_session<R, W>(
    config: &ClientConfig,
    input: R,
    output: &mut W,
    prompt: bool,
) -> Result<(), AppError>
where
    R: BufRead,
    W: Write,
{
    let mut session = Session::connect(config.server_address())?;
    say(output, "Connected to the server successfully.")?;
    converse(&mut session, input, output, prompt)?;
    say(output, "Connection halted.")?;
    say(output, "See you next time.")
}

/// Prints each response and answers it with the next input line.
///
/// `exit`, `quit`, the raw disconnect token, and end of input all send the
/// disconnect token and close the session.
///
/// # Errors
///
/// Returns [`AppError`] when a frame cannot be exchanged or a stream breaks.
pub fn converse<R, W>(
    session: &mut Session,
    input: R,
    output: &mut W,
    prompt: bool,
) -> Result<(), AppError>
where
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    while let Some(response) = session.next_text()? {
        say(output, &response)?;
        if prompt {
            write!(output, "{PROMPT}")
                .and_then(|()| output.flush())
                .map_err(AppError::WriteOutput)?;
        }
        let line = lines.next().transpose().map_err(AppError::ReadInput)?;
        match line.as_deref().map(str::trim) {
            Some(request) if !ends_session(request) => session.send(request)?,
            _ => return session.close(),
        }
    }
    Ok(())
}

fn ends_session(request: &str) -> bool {
    request == DISCONNECT_TOKEN || EXIT_WORDS.contains(&request)
}

fn say<W: Write>(output: &mut W, text: &str) -> Result<(), AppError> {
    writeln!(output, "{text}").map_err(AppError::WriteOutput)
}

#[cfg(test)]
mod tests;
