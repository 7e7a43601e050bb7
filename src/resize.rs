//! Forwards window-size changes of the controlling terminal to the PTY.
//!
//! SIGWINCH is blocked in the calling thread before any relay thread exists,
//! so every later thread inherits the mask and the signal is only ever picked
//! up by the listener's `sigwait`.

use std::io;
use std::thread;

use nix::libc::c_int;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::{debug, warn};

use crate::config::Config;
use crate::session::ResizeHandle;
use crate::terminal;

extern "C" fn on_sigwinch(_: c_int) {}

/// Subscribe to SIGWINCH and apply the current size once right away.
///
/// Must run on the main thread before the relay threads are spawned.
pub fn start(handle: ResizeHandle, config: &Config) -> io::Result<()> {
    let mut winch = SigSet::empty();
    winch.add(Signal::SIGWINCH);

    // SIGWINCH is ignored by default; give it a handler so it stays pending
    // for sigwait on every platform.
    let action = SigAction::new(
        SigHandler::Handler(on_sigwinch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler does nothing, so it is async-signal-safe.
    unsafe { signal::sigaction(Signal::SIGWINCH, &action) }.map_err(io::Error::from)?;
    winch.thread_block().map_err(io::Error::from)?;

    // The child may have been created before we were listening
    apply_current_size(&handle, config);

    let config = config.clone();
    thread::Builder::new()
        .name("resize".to_string())
        .spawn(move || loop {
            match winch.wait() {
                Ok(Signal::SIGWINCH) => apply_current_size(&handle, &config),
                Ok(other) => debug!("unexpected signal {:?} in resize listener", other),
                Err(e) => {
                    warn!("resize listener stopped: {}", e);
                    break;
                }
            }
        })?;
    Ok(())
}

fn apply_current_size(handle: &ResizeHandle, config: &Config) {
    let size = terminal::current_size(&io::stdin(), config);
    if handle.resize(size.rows, size.cols) {
        debug!(rows = size.rows, cols = size.cols, "propagated window size");
    }
}
