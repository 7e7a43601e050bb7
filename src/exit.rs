//! Exit coordination: turn the child's termination into our exit code.

use std::io;

use portable_pty::ExitStatus;

/// Exit code used whenever the child yields no usable numeric status.
pub const ABNORMAL_EXIT: i32 = 1;

/// Map the child's termination status to this process's exit code.
///
/// A child killed by a signal carries code 1 in `ExitStatus`, so it maps to
/// `ABNORMAL_EXIT` like any other status without a numeric code.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if status.success() {
        return 0;
    }
    match i32::try_from(status.exit_code()) {
        Ok(code) if code != 0 => code,
        _ => ABNORMAL_EXIT,
    }
}

/// Exit code for the outcome of waiting on the child.
pub fn code_for_wait(result: &io::Result<ExitStatus>) -> i32 {
    match result {
        Ok(status) => exit_code(status),
        Err(_) => ABNORMAL_EXIT,
    }
}
