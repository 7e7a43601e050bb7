//! Terminal mode controller.
//!
//! [`RawModeGuard`] captures the controlling terminal's attributes, switches it
//! to raw mode and puts the captured attributes back exactly once, either
//! through [`RawModeGuard::restore`] or on drop.

use std::io;
use std::os::fd::{AsFd, AsRawFd};

use nix::errno::Errno;
use nix::sys::termios::{self, SetArg, SpecialCharacterIndices, Termios};
use portable_pty::PtySize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ModeError;

/// Snapshot of a terminal's attributes taken before raw mode.
#[derive(Clone)]
pub struct TerminalState(Termios);

impl TerminalState {
    /// Read the current attributes of `fd`.
    pub fn capture<F: AsFd>(fd: &F) -> Result<Self, ModeError> {
        termios::tcgetattr(fd.as_fd()).map(Self).map_err(mode_error)
    }

    /// The raw-mode counterpart of this snapshot.
    fn raw(&self) -> Termios {
        let mut raw = self.0.clone();
        termios::cfmakeraw(&mut raw);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw
    }

    fn apply<F: AsFd>(&self, fd: &F) -> Result<(), ModeError> {
        termios::tcsetattr(fd.as_fd(), SetArg::TCSANOW, &self.0).map_err(mode_error)
    }
}

fn mode_error(errno: Errno) -> ModeError {
    match errno {
        Errno::ENOTTY => ModeError::NotATerminal,
        other => ModeError::Attributes(io::Error::from(other)),
    }
}

/// Keeps a terminal in raw mode for as long as it is alive.
pub struct RawModeGuard<F: AsFd> {
    fd: F,
    original: Option<TerminalState>,
}

impl<F: AsFd> RawModeGuard<F> {
    /// Capture `fd`'s attributes and switch it to raw mode.
    ///
    /// On failure the terminal is left untouched.
    pub fn enter(fd: F) -> Result<Self, ModeError> {
        let original = TerminalState::capture(&fd)?;
        termios::tcsetattr(fd.as_fd(), SetArg::TCSANOW, &original.raw()).map_err(mode_error)?;
        debug!("terminal switched to raw mode");
        Ok(Self {
            fd,
            original: Some(original),
        })
    }

    /// Put the captured attributes back. Later calls and the eventual drop do
    /// nothing.
    pub fn restore(&mut self) -> Result<(), ModeError> {
        match self.original.take() {
            Some(state) => {
                debug!("restoring terminal attributes");
                state.apply(&self.fd)
            }
            None => Ok(()),
        }
    }
}

impl<F: AsFd> Drop for RawModeGuard<F> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("failed to restore terminal attributes: {}", e);
        }
    }
}

mod ioctl {
    nix::ioctl_read_bad!(
        /// # Safety
        ///
        /// `fd` must be open and `data` must point to a writable `winsize`.
        tiocgwinsz,
        nix::libc::TIOCGWINSZ,
        nix::libc::winsize
    );
}

/// Window size of the terminal behind `fd` as `(rows, cols)`.
fn window_size<F: AsFd>(fd: &F) -> Option<(u16, u16)> {
    let mut ws = nix::libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: `ws` is a valid winsize and the descriptor is borrowed for the call.
    unsafe { ioctl::tiocgwinsz(fd.as_fd().as_raw_fd(), &mut ws) }.ok()?;
    (ws.ws_row > 0 && ws.ws_col > 0).then_some((ws.ws_row, ws.ws_col))
}

/// Size of the terminal behind `fd`, the terminal the mode guard owns.
///
/// Falls back to the controlling terminal and then to the configured size.
pub fn current_size<F: AsFd>(fd: &F, config: &Config) -> PtySize {
    let (rows, cols) = window_size(fd)
        .or_else(|| match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => Some((rows, cols)),
            _ => None,
        })
        .unwrap_or((config.fallback_rows, config.fallback_cols));
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
