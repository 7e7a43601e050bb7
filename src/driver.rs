//! Top-level flow: raw mode, launch, relay, wait, teardown.

use std::ffi::OsString;

use crate::cli::Invocation;
use crate::config::Config;
use crate::error::DriverError;
use crate::platform::Capabilities;

/// Run one helper invocation and return the exit code to use.
///
/// `args` are the arguments after the program name. Raw mode and the PTY
/// session are released before this returns, on every path.
pub fn run<I>(args: I, config: &Config) -> Result<i32, DriverError>
where
    I: IntoIterator<Item = OsString>,
{
    let invocation = Invocation::from_args(args)?;

    let caps = Capabilities::current();
    if !caps.pty_supported {
        return Err(DriverError::UnsupportedPlatform);
    }

    run_session(&invocation, config, caps)
}

#[cfg(unix)]
fn run_session(
    invocation: &Invocation,
    config: &Config,
    caps: Capabilities,
) -> Result<i32, DriverError> {
    use std::io;
    use std::sync::mpsc;

    use tracing::{info, warn};

    use crate::error::LaunchError;
    use crate::session::PtySession;
    use crate::terminal::{self, RawModeGuard};
    use crate::{exit, relay, resize};

    let mut raw_mode = RawModeGuard::enter(io::stdin())?;

    let size = terminal::current_size(&io::stdin(), config);
    let mut session = PtySession::launch(invocation, size, config)?;

    if caps.needs_resize_propagation() {
        if let Err(e) = resize::start(session.resize_handle(), config) {
            warn!("window size changes will not be forwarded: {}", e);
        }
    }

    let (done_tx, done_rx) = mpsc::channel();
    relay::spawn_output_relay(
        session.take_reader()?,
        io::stdout(),
        config.buffer_size,
        done_tx.clone(),
    )
    .map_err(|e| LaunchError::Handle(e.into()))?;
    let slot = session.writer_slot();
    relay::spawn_input_relay(
        io::stdin(),
        session.take_writer()?,
        config.buffer_size,
        done_tx,
        move |writer| slot.park(writer),
    )
    .map_err(|e| LaunchError::Handle(e.into()))?;

    let waited = session.wait();
    let code = exit::code_for_wait(&waited);

    if let Some(end) = relay::await_output_drain(&done_rx, config.drain_timeout()) {
        info!(bytes = end.bytes, "child output drained");
    }

    session.close();
    if let Err(e) = raw_mode.restore() {
        warn!("{}", e);
    }

    match waited {
        Ok(status) => {
            info!(?status, code, "child exited");
            Ok(code)
        }
        Err(e) => Err(DriverError::Wait(e)),
    }
}

#[cfg(not(unix))]
fn run_session(
    _invocation: &Invocation,
    _config: &Config,
    _caps: Capabilities,
) -> Result<i32, DriverError> {
    Err(DriverError::UnsupportedPlatform)
}
