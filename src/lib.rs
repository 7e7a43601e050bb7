//! pty-helper library crate.
//!
//! Runs a command attached to a pseudo-terminal so that a program which is not
//! itself terminal-aware can drive an interactive, keystroke-driven child:
//! - raw-mode control of the invoking terminal
//! - PTY allocation and child launch
//! - window-size propagation
//! - byte-transparent relay in both directions
//! - exit-code mirroring

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod exit;
pub mod logging;
pub mod platform;
pub mod relay;
pub mod session;

#[cfg(unix)]
pub mod resize;
#[cfg(unix)]
pub mod terminal;

pub use driver::run;
pub use error::DriverError;
