//! Error taxonomy for the PTY helper.
//!
//! Fatal failures surface as [`DriverError`] and always map to exit code `1`.
//! Relay failures are not errors at this level: each copy loop reports a
//! [`RelayEnd`] instead.

use std::fmt;
use std::io;

use thiserror::Error;

/// Guidance printed when no pseudo-terminal can be used on this host.
pub const NON_PTY_HINT: &str =
    "hint: pseudo-terminals are unavailable here; run the command without pty-helper instead";

/// Fatal failures of a helper invocation.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("missing command")]
    Usage,

    #[error("pseudo-terminals are not supported on this platform")]
    UnsupportedPlatform,

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error("failed to wait for child process: {0}")]
    Wait(#[source] io::Error),
}

impl DriverError {
    /// Exit code reported for every fatal failure.
    pub const EXIT_CODE: i32 = 1;

    /// Extra guidance for the orchestrator, if the failure means it should pick
    /// a different execution mode.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DriverError::UnsupportedPlatform
            | DriverError::Launch(LaunchError::PtyUnavailable(_)) => Some(NON_PTY_HINT),
            _ => None,
        }
    }
}

/// Failures while allocating the pseudo-terminal or spawning the child.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// No pseudo-terminal pair could be allocated.
    #[error("unable to allocate a pseudo-terminal: {0:#}")]
    PtyUnavailable(#[source] anyhow::Error),

    /// The pair exists but the command could not be started in it.
    #[error("failed to launch `{command}`: {source:#}")]
    Spawn {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// The controlling side could not provide a reader or writer.
    #[error("failed to open pseudo-terminal stream: {0:#}")]
    Handle(#[source] anyhow::Error),
}

/// Failures switching the controlling terminal into raw mode.
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("standard input is not a terminal; cannot enter raw mode")]
    NotATerminal,

    #[error("failed to set terminal to raw mode: {0}")]
    Attributes(#[source] io::Error),
}

/// Which way a relay loop copies bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Controlling side of the PTY to our standard output.
    Output,
    /// Our standard input to the controlling side of the PTY.
    Input,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Output => write!(f, "pty -> stdout"),
            Direction::Input => write!(f, "stdin -> pty"),
        }
    }
}

/// Report sent by a relay loop when it stops copying.
#[derive(Debug)]
pub struct RelayEnd {
    pub direction: Direction,
    /// Bytes copied before the loop stopped.
    pub bytes: u64,
    /// `None` when the source reached end-of-stream.
    pub error: Option<io::Error>,
}
