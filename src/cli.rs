//! Command-line handling.
//!
//! Arguments are never interpreted: the first one is the command, the rest are
//! passed to it verbatim.

use std::ffi::OsString;

use crate::error::DriverError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The command to run inside the pseudo-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Build an invocation from the arguments following the program name.
    pub fn from_args<I>(args: I) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut args = args.into_iter();
        let command = args.next().ok_or(DriverError::Usage)?;
        Ok(Self {
            command,
            args: args.collect(),
        })
    }

    /// Command name for diagnostics.
    pub fn display_command(&self) -> String {
        self.command.to_string_lossy().into_owned()
    }
}

/// Print usage information
pub fn print_usage() {
    eprintln!("pty-helper {} - run a command inside a pseudo-terminal", VERSION);
    eprintln!();
    eprintln!("Usage: pty-helper <command> [args...]");
    eprintln!();
    eprintln!("Standard input is switched to raw mode and relayed to the command;");
    eprintln!("the command's terminal output is relayed to standard output.");
    eprintln!("The exit code mirrors the command's exit code (1 if it was killed).");
}
