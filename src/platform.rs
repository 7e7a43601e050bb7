//! What the host platform can do for us.

/// Platform capability flags consulted once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Native pseudo-terminal and raw-mode support.
    pub pty_supported: bool,
    /// The PTY follows the controlling terminal's size without help. When
    /// false, the resize propagator must forward every size change. Always
    /// false where `pty_supported` is false.
    pub inherits_size: bool,
}

impl Capabilities {
    pub const fn current() -> Self {
        Self {
            pty_supported: cfg!(unix),
            inherits_size: false,
        }
    }

    /// Whether a resize propagator has to run for this session.
    pub fn needs_resize_propagation(&self) -> bool {
        self.pty_supported && !self.inherits_size
    }
}
