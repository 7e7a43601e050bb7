//! I/O relay between our standard streams and the PTY's controlling side.
//!
//! Both directions run on their own detached thread. They are never joined:
//! a loop blocked on a stream that never ends would otherwise hold the
//! process open after the child is gone.

use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Direction, RelayEnd};

/// Copy bytes from `reader` to `writer` until end-of-stream or an error.
///
/// Every chunk is written and flushed as soon as it is read. Returns the
/// number of bytes copied and the error that stopped the loop, if any.
pub fn copy_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> (u64, Option<io::Error>)
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return (copied, None),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (copied, Some(e)),
        };
        if let Err(e) = writer.write_all(&buf[..n]).and_then(|()| writer.flush()) {
            return (copied, Some(e));
        }
        copied += n as u64;
    }
}

fn spawn_loop<R, W, K>(
    direction: Direction,
    mut reader: R,
    mut writer: W,
    buffer_size: usize,
    done: Sender<RelayEnd>,
    keep: K,
) -> io::Result<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
    K: FnOnce(W) + Send + 'static,
{
    let name = match direction {
        Direction::Output => "relay-output",
        Direction::Input => "relay-input",
    };
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let (bytes, error) = copy_stream(&mut reader, &mut writer, buffer_size);
        debug!(%direction, bytes, error = ?error, "relay ended");
        keep(writer);
        let _ = done.send(RelayEnd {
            direction,
            bytes,
            error,
        });
    })?;
    Ok(())
}

/// Loop A: controlling side → standard output.
pub fn spawn_output_relay<R, W>(
    pty_reader: R,
    stdout: W,
    buffer_size: usize,
    done: Sender<RelayEnd>,
) -> io::Result<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    spawn_loop(Direction::Output, pty_reader, stdout, buffer_size, done, drop)
}

/// Loop B: standard input → controlling side.
///
/// When standard input ends the loop just stops. `park` receives the PTY
/// writer before the end is reported and must keep it open: the child gets
/// no end-of-file or any other byte that was not read from `stdin`.
pub fn spawn_input_relay<R, W, P>(
    stdin: R,
    pty_writer: W,
    buffer_size: usize,
    done: Sender<RelayEnd>,
    park: P,
) -> io::Result<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
    P: FnOnce(W) + Send + 'static,
{
    spawn_loop(Direction::Input, stdin, pty_writer, buffer_size, done, park)
}

/// Wait up to `timeout` for the output loop to finish delivering the child's
/// remaining bytes. Returns its report if it ended in time.
pub fn await_output_drain(done: &Receiver<RelayEnd>, timeout: Duration) -> Option<RelayEnd> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match done.recv_timeout(remaining) {
            Ok(end) if end.direction == Direction::Output => return Some(end),
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                debug!("output relay still running at exit; abandoning it");
                return None;
            }
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc, Mutex};

    /// Reader that yields an interruption before each chunk.
    struct Interrupting {
        chunks: Vec<&'static [u8]>,
        interrupted: bool,
    }

    impl Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.interrupted = false;
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    /// Writer that accepts `limit` bytes and then fails.
    struct Broken {
        limit: usize,
        written: Vec<u8>,
    }

    impl Write for Broken {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() >= self.limit {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            let n = buf.len().min(self.limit - self.written.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copies_every_byte_unchanged() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut reader = Cursor::new(data.clone());
        let mut out = Vec::new();

        let (bytes, error) = copy_stream(&mut reader, &mut out, 512);
        assert!(error.is_none());
        assert_eq!(bytes, data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn control_bytes_pass_through() {
        let data = b"y\x03\x1b[A\r\n\x04n".to_vec();
        let mut out = Vec::new();
        copy_stream(&mut Cursor::new(data.clone()), &mut out, 4);
        assert_eq!(out, data);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut reader = Interrupting {
            chunks: vec![b"abc", b"def"],
            interrupted: false,
        };
        let mut out = Vec::new();
        let (bytes, error) = copy_stream(&mut reader, &mut out, 16);
        assert!(error.is_none());
        assert_eq!(bytes, 6);
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn write_failure_ends_loop_with_error() {
        let mut reader = Cursor::new(vec![7u8; 100]);
        let mut writer = Broken {
            limit: 10,
            written: Vec::new(),
        };
        let (bytes, error) = copy_stream(&mut reader, &mut writer, 32);
        assert_eq!(error.unwrap().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(bytes, 0);
        assert_eq!(writer.written.len(), 10);
    }

    #[test]
    fn output_relay_reports_end_of_stream() {
        let (tx, rx) = mpsc::channel();
        spawn_output_relay(Cursor::new(b"hello\r\n".to_vec()), io::sink(), 64, tx).unwrap();

        let end = await_output_drain(&rx, Duration::from_secs(5)).unwrap();
        assert_eq!(end.direction, Direction::Output);
        assert_eq!(end.bytes, 7);
        assert!(end.error.is_none());
    }

    #[test]
    fn drain_skips_input_reports() {
        let (tx, rx) = mpsc::channel();
        spawn_input_relay(Cursor::new(b"n".to_vec()), io::sink(), 64, tx.clone(), drop).unwrap();
        spawn_output_relay(Cursor::new(b"ok".to_vec()), io::sink(), 64, tx).unwrap();

        let end = await_output_drain(&rx, Duration::from_secs(5)).unwrap();
        assert_eq!(end.direction, Direction::Output);
        assert_eq!(end.bytes, 2);
    }

    /// Writer that records what it was given and whether it was dropped.
    struct Recording {
        written: Arc<Mutex<Vec<u8>>>,
        dropped: Arc<AtomicBool>,
    }

    impl Write for Recording {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for Recording {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn input_relay_parks_writer_at_end_of_stdin() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let dropped = Arc::new(AtomicBool::new(false));
        let writer = Recording {
            written: Arc::clone(&written),
            dropped: Arc::clone(&dropped),
        };
        let (tx, rx) = mpsc::channel();
        let (park_tx, park_rx) = mpsc::channel();

        spawn_input_relay(Cursor::new(b"y".to_vec()), writer, 64, tx, move |w| {
            park_tx.send(w).unwrap();
        })
        .unwrap();

        let end = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(end.direction, Direction::Input);
        assert!(end.error.is_none());
        let parked = park_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(*written.lock().unwrap(), b"y");
        drop(parked);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn drain_gives_up_after_timeout() {
        let (_tx, rx) = mpsc::channel::<RelayEnd>();
        let started = Instant::now();
        assert!(await_output_drain(&rx, Duration::from_millis(50)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
