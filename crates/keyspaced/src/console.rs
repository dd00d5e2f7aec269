//! Operator console read from standard input.

use std::io::{self, BufRead, Write};

use keyspace_net::{ConnectionServer, ServerStatus};
use keyspace_tree::{KeySpaceNode, is_request};

const CONSOLE_COMMANDS: [&str; 3] = [
    "exit    | quit    - stops the server and exits",
    "help    | ?       - shows this message",
    "status  | state   - shows the current server state",
];

/// What the console loop does after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFlow {
    /// Read the next line.
    Continue,
    /// Stop the console and the daemon.
    Exit,
}

/// Line-oriented operator console bound to a running server.
pub struct Console<'a> {
    server: &'a ConnectionServer,
    root: &'a KeySpaceNode,
}

impl<'a> Console<'a> {
    /// Binds a console to `server` and the tree it serves.
    #[must_use]
    pub const fn new(server: &'a ConnectionServer, root: &'a KeySpaceNode) -> Self {
        Self { server, root }
    }

    /// Reads commands until `exit`, `quit`, or end of input.
    ///
    /// `prompt` controls whether `>> ` is written before each read.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures on the console streams.
    pub fn run<R, W>(&self, input: R, output: &mut W, prompt: bool) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        writeln!(output, "Key-space server started.")?;
        writeln!(output, "See 'help' for allowed commands.")?;
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(output, ">> ")?;
                output.flush()?;
            }
            let Some(line) = lines.next().transpose()? else {
                break;
            };
            if self.handle(&line, output)? == ConsoleFlow::Exit {
                return Ok(());
            }
        }
        writeln!(output, "Halting...")
    }

    /// Executes one console line.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `output`.
    pub fn handle<W: Write>(&self, line: &str, output: &mut W) -> io::Result<ConsoleFlow> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(ConsoleFlow::Continue);
        }
        let command = trimmed.to_ascii_lowercase();
        match command.as_str() {
            "exit" | "quit" => {
                writeln!(output, "See you next time.")?;
                return Ok(ConsoleFlow::Exit);
            }
            "help" | "?" => self.write_help(output)?,
            "status" | "state" => self.write_status(output)?,
            _ if is_request(trimmed) => {
                writeln!(output, "{}", self.root.handle_request(trimmed).render())?;
            }
            _ => writeln!(output, "Unknown command: '{trimmed}'")?,
        }
        Ok(ConsoleFlow::Continue)
    }

    fn write_help<W: Write>(&self, output: &mut W) -> io::Result<()> {
        writeln!(output, "Commands:")?;
        for command in CONSOLE_COMMANDS {
            writeln!(output, "    {command}")?;
        }
        writeln!(output)?;
        writeln!(output, "{}", self.root.handle_request("help").render())
    }

    fn write_status<W: Write>(&self, output: &mut W) -> io::Result<()> {
        let state = if self.server.status() == ServerStatus::Up {
            "okay"
        } else {
            "stopped"
        };
        writeln!(output, "Status:")?;
        writeln!(output, "  state: {state}")?;
        writeln!(output, "  address: {}", self.server.local_addr())?;
        writeln!(output, "  threads: {}", self.server.thread_pool().thread_count())?;
        writeln!(output, "  peers: {}", self.server.peer_count())?;
        writeln!(output, "  detail: {}", self.server.explain_status())
    }
}
