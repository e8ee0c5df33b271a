// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// The real terminal adapter.
//
// `Tty` glues the pieces together: `RawTerminal` for raw mode, `Parser` for
// decoding, `OutputBuffer` + `CellWriter` for output. Everything runs on
// the caller's thread. `read_event` blocks in `poll(2)` on stdin and the
// read end of a wake pipe:
//
//   - no timeout while the parser holds nothing, so an idle editor costs
//     zero CPU;
//   - `ESC_TIMEOUT_MS` while bytes are pending, so a lone ESC resolves to
//     the Escape key quickly;
//   - `PASTE_STALL_MS` inside a bracketed paste, where an ESC is paste
//     content and only a lost closing delimiter should end the wait.
//
// The SIGWINCH handler sets a flag and writes a byte to the wake pipe. The
// signal may be delivered to any thread (the log writer has its own), so
// EINTR on this one cannot be relied on; the pipe wakes the poll wherever
// the handler ran.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::ansi::{self, DecMode};
use crate::cell::{CellWrite, Frame};
use crate::input::{InputEvent, Parser};
use crate::io::TerminalIo;
use crate::output::{encode_frame, CellWriter, OutputBuffer};
use crate::terminal::{self, RawTerminal, Size};

/// How long a lone ESC waits for the rest of a sequence.
const ESC_TIMEOUT_MS: i32 = 25;

/// How long a bracketed paste may go quiet before what arrived is
/// delivered without its closing delimiter.
const PASTE_STALL_MS: i32 = 1000;

/// Sized for typical terminal input: a keypress is 1-6 bytes, a paste can
/// be kilobytes.
const READ_BUF_SIZE: usize = 4096;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// The terminal could not be set up. Raised before raw mode is entered, so
/// nothing needs restoring.
#[derive(Debug, thiserror::Error)]
pub enum TerminalInitError {
    #[error("stdin and stdout must both be a terminal")]
    NotATty,
    #[error("terminal setup failed: {0}")]
    Io(#[from] io::Error),
}

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler, cleared by `read_event`.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Both ends of the wake pipe, -1 until created.
static WAKE_READ: AtomicI32 = AtomicI32::new(-1);
static WAKE_WRITE: AtomicI32 = AtomicI32::new(-1);

/// Create the wake pipe once per process. Both ends are non-blocking and
/// close-on-exec.
#[cfg(unix)]
fn open_wake_pipe() -> io::Result<()> {
    if WAKE_READ.load(Ordering::Acquire) >= 0 {
        return Ok(());
    }
    let mut fds = [-1; 2];
    unsafe {
        if libc::pipe(fds.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }
        for fd in fds {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags < 0
                || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) != 0
                || libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) != 0
            {
                let err = io::Error::last_os_error();
                libc::close(fds[0]);
                libc::close(fds[1]);
                return Err(err);
            }
        }
    }
    // Another `Tty::open` got there first.
    if WAKE_WRITE
        .compare_exchange(-1, fds[1], Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
        return Ok(());
    }
    WAKE_READ.store(fds[0], Ordering::Release);
    Ok(())
}

/// Install the resize handler and its wake pipe.
#[cfg(unix)]
fn install_sigwinch_handler() -> io::Result<()> {
    open_wake_pipe()?;
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        if libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Only async-signal-safe work here: an atomic store and `write(2)`.
#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
    let fd = WAKE_WRITE.load(Ordering::Relaxed);
    if fd >= 0 {
        let byte = 1u8;
        // A full pipe already holds a wakeup.
        unsafe {
            libc::write(fd, (&raw const byte).cast(), 1);
        }
    }
}

#[cfg(not(unix))]
fn install_sigwinch_handler() -> io::Result<()> {
    Ok(())
}

// ─── Low-level stdin ─────────────────────────────────────────────────────────

/// What a single wait on stdin produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ready {
    Readable,
    TimedOut,
    /// The wake pipe fired or the poll was interrupted; check for a resize.
    Woken,
}

/// Empty the wake pipe so the next poll blocks again.
#[cfg(unix)]
fn drain_wake_pipe(fd: libc::c_int) {
    let mut sink = [0u8; 64];
    while unsafe { libc::read(fd, sink.as_mut_ptr().cast(), sink.len()) } > 0 {}
}

#[cfg(unix)]
fn wait_stdin(timeout_ms: i32) -> io::Result<Ready> {
    let wake = WAKE_READ.load(Ordering::Acquire);
    // poll(2) skips entries with a negative fd.
    let mut pfds = [
        libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: wake,
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let ready = unsafe { libc::poll(pfds.as_mut_ptr(), 2, timeout_ms) };

    match ready {
        0 => Ok(Ready::TimedOut),
        n if n > 0 => {
            if pfds[1].revents & libc::POLLIN != 0 {
                drain_wake_pipe(wake);
                Ok(Ready::Woken)
            } else {
                Ok(Ready::Readable)
            }
        }
        _ => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(Ready::Woken)
            } else {
                Err(err)
            }
        }
    }
}

#[cfg(not(unix))]
fn wait_stdin(_timeout_ms: i32) -> io::Result<Ready> {
    Ok(Ready::Readable)
}

#[cfg(unix)]
fn read_stdin(buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
    Ok(n as usize)
}

#[cfg(not(unix))]
fn read_stdin(buf: &mut [u8]) -> io::Result<usize> {
    use std::io::Read;
    io::stdin().lock().read(buf)
}

/// How long `read_event` may block given what the parser holds.
fn poll_timeout(parser: &Parser) -> i32 {
    if parser.in_paste() {
        PASTE_STALL_MS
    } else if parser.has_pending() {
        ESC_TIMEOUT_MS
    } else {
        -1
    }
}

// ─── Tty ─────────────────────────────────────────────────────────────────────

/// The controlling terminal, behind [`TerminalIo`].
pub struct Tty {
    terminal: RawTerminal,
    parser: Parser,
    pending: VecDeque<InputEvent>,
    out: OutputBuffer,
    writer: CellWriter,
}

impl Tty {
    /// Check that we are on a terminal and prepare the adapter.
    ///
    /// Does not enter raw mode; that is the guard's job.
    ///
    /// # Errors
    ///
    /// [`TerminalInitError::NotATty`] when stdin or stdout is redirected,
    /// [`TerminalInitError::Io`] if the resize handler cannot be installed.
    pub fn open() -> Result<Self, TerminalInitError> {
        if !terminal::stdio_is_tty() {
            return Err(TerminalInitError::NotATty);
        }
        install_sigwinch_handler()?;

        let terminal = RawTerminal::new();
        tracing::info!(rows = terminal.size().rows, cols = terminal.size().cols, "terminal opened");

        Ok(Self {
            terminal,
            parser: Parser::new(),
            pending: VecDeque::new(),
            out: OutputBuffer::new(),
            writer: CellWriter::new(),
        })
    }

    fn take_resize(&mut self) -> Option<InputEvent> {
        if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
            let size = self.terminal.refresh_size();
            tracing::debug!(rows = size.rows, cols = size.cols, "resize");
            return Some(InputEvent::Resize {
                rows: size.rows,
                cols: size.cols,
            });
        }
        None
    }
}

impl TerminalIo for Tty {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        self.writer.reset_state();
        self.terminal.enter()
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        self.out.clear();
        self.terminal.leave()
    }

    fn read_event(&mut self) -> io::Result<InputEvent> {
        let mut buf = [0u8; READ_BUF_SIZE];

        loop {
            if let Some(resize) = self.take_resize() {
                return Ok(resize);
            }
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            match wait_stdin(poll_timeout(&self.parser))? {
                Ready::Woken => {}
                Ready::TimedOut => self.pending.extend(self.parser.flush()),
                Ready::Readable => {
                    let n = match read_stdin(&mut buf) {
                        Ok(n) => n,
                        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                        Err(err) => return Err(err),
                    };
                    if n == 0 {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
                    }
                    self.pending.extend(self.parser.advance(&buf[..n]));
                }
            }
        }
    }

    fn viewport_size(&self) -> Size {
        self.terminal.size()
    }

    fn write_cells(&mut self, cells: &[CellWrite]) -> io::Result<()> {
        for run in cells {
            self.writer.write_run(&mut self.out, run);
        }
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        ansi::reset_style(&mut self.out)?;
        ansi::clear_screen(&mut self.out)?;
        self.writer.reset_state();
        Ok(())
    }

    fn place_cursor(&mut self, at: Option<(u16, u16)>) -> io::Result<()> {
        match at {
            Some((row, col)) => {
                ansi::move_to(&mut self.out, row, col)?;
                ansi::set(&mut self.out, DecMode::Cursor)
            }
            None => ansi::unset(&mut self.out, DecMode::Cursor),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.out.flush_to(&mut lock)
    }

    /// One synchronized write per frame.
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        encode_frame(&mut self.out, &mut self.writer, frame);
        let bytes = self.out.len();
        self.flush()?;
        tracing::trace!(bytes, runs = frame.cells.len(), clear = frame.clear, "frame written");
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
