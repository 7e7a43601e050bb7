//! Pseudo-terminal session: the PTY pair and the child bound to it.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use portable_pty::{native_pty_system, Child, CommandBuilder, ExitStatus, MasterPty, PtySize};
use tracing::{debug, info};

use crate::cli::Invocation;
use crate::config::Config;
use crate::error::LaunchError;

/// A child process running on the subordinate side of a PTY.
pub struct PtySession {
    resize: ResizeHandle,
    child: Box<dyn Child + Send + Sync>,
    reader: Option<Box<dyn Read + Send>>,
    writer: WriterSlot,
}

impl PtySession {
    /// Allocate a PTY of `size` and start the invocation inside it.
    pub fn launch(
        invocation: &Invocation,
        size: PtySize,
        config: &Config,
    ) -> Result<Self, LaunchError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(size)
            .context("Failed to open PTY")
            .map_err(LaunchError::PtyUnavailable)?;

        let mut cmd = CommandBuilder::new(&invocation.command);
        cmd.args(&invocation.args);

        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let parent_term = std::env::var("TERM").ok();
        if let Some(term) = config.child_term(parent_term.as_deref()) {
            cmd.env("TERM", term);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|source| LaunchError::Spawn {
                command: invocation.display_command(),
                source,
            })?;

        // The child holds its own copies; ours would keep the PTY open after it exits
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(LaunchError::Handle)?;
        let writer = pair.master.take_writer().map_err(LaunchError::Handle)?;

        info!(
            command = %invocation.display_command(),
            pid = ?child.process_id(),
            rows = size.rows,
            cols = size.cols,
            "child launched"
        );

        Ok(Self {
            resize: ResizeHandle::new(pair.master, size),
            child,
            reader: Some(reader),
            writer: WriterSlot::holding(writer),
        })
    }

    /// Handle that lets another thread resize this session.
    pub fn resize_handle(&self) -> ResizeHandle {
        self.resize.clone()
    }

    /// Controlling-side output stream. Can be taken once.
    pub fn take_reader(&mut self) -> Result<Box<dyn Read + Send>, LaunchError> {
        self.reader
            .take()
            .ok_or_else(|| LaunchError::Handle(anyhow!("PTY reader already taken")))
    }

    /// Controlling-side input stream. Can be taken again once it has been
    /// parked back into [`PtySession::writer_slot`].
    pub fn take_writer(&mut self) -> Result<Box<dyn Write + Send>, LaunchError> {
        self.writer
            .take()
            .ok_or_else(|| LaunchError::Handle(anyhow!("PTY writer already taken")))
    }

    /// Where the input relay hands the writer back when standard input ends.
    ///
    /// Dropping the writer makes the PTY layer type a newline and the EOF
    /// character into the child, so it stays parked here until [`close`].
    ///
    /// [`close`]: PtySession::close
    pub fn writer_slot(&self) -> WriterSlot {
        self.writer.clone()
    }

    /// Block until the child terminates.
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait()
    }

    /// Release the controlling side. Safe to call repeatedly and after the
    /// child has exited.
    pub fn close(&mut self) {
        self.reader = None;
        drop(self.writer.take());
        self.resize.close();
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Shared home of the controlling-side writer.
#[derive(Clone)]
pub struct WriterSlot {
    inner: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl WriterSlot {
    fn holding(writer: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(writer))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Write + Send>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keep `writer` open until the session closes.
    pub fn park(&self, writer: Box<dyn Write + Send>) {
        *self.lock() = Some(writer);
    }

    fn take(&self) -> Option<Box<dyn Write + Send>> {
        self.lock().take()
    }
}

struct ResizeState {
    master: Option<Box<dyn MasterPty + Send>>,
    size: PtySize,
}

/// Shared access to the controlling side for size updates only.
///
/// Data flows through the reader and writer taken from the session; this
/// handle never touches them.
#[derive(Clone)]
pub struct ResizeHandle {
    inner: Arc<Mutex<ResizeState>>,
}

impl ResizeHandle {
    fn new(master: Box<dyn MasterPty + Send>, size: PtySize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResizeState {
                master: Some(master),
                size,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResizeState> {
        // Nothing panics while holding this lock, but keep going if something did
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply new dimensions. Returns true if the PTY was actually resized;
    /// unchanged sizes, closed sessions and failures all return false.
    pub fn resize(&self, rows: u16, cols: u16) -> bool {
        let mut state = self.lock();
        if state.size.rows == rows && state.size.cols == cols {
            return false;
        }
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        let Some(master) = state.master.as_ref() else {
            return false;
        };
        match master.resize(size) {
            Ok(()) => {
                debug!(rows, cols, "PTY resized");
                state.size = size;
                true
            }
            Err(e) => {
                debug!(rows, cols, "ignoring PTY resize failure: {:#}", e);
                false
            }
        }
    }

    fn close(&self) {
        if self.lock().master.take().is_some() {
            debug!("PTY controlling side closed");
        }
    }
}
