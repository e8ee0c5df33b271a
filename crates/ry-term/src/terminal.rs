// SPDX-License-Identifier: MIT
//
// The controlling terminal's modes: raw termios, the alternate screen,
// bracketed paste and focus reports.
//
// `RawTerminal::enter` turns them all on and `leave` turns them all off,
// alternate screen last. Both are idempotent, which lets the guard in
// `io.rs` and our own `Drop` call `leave` without bookkeeping.
//
// A panic can fire while the stdout lock is held, so the panic hook never
// takes it. It writes `PANIC_RESTORE` to fd 1 with a bare `write(2)` and
// then puts back the termios parked in `termios::SAVED`.
//
// Unsafe is limited to termios, `ioctl(TIOCGWINSZ)`, `isatty` and that one
// raw write.
#![allow(unsafe_code)]

use std::io::{self, Write};
use std::sync::Once;

use crate::ansi::{self, DecMode};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

impl Size {
    /// Used when the OS cannot report a size (pipes, CI).
    pub const DEFAULT: Self = Self { rows: 24, cols: 80 };

    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

// ─── Queries ────────────────────────────────────────────────────────────────

/// Size of the terminal on stdout, if there is one.
#[cfg(unix)]
#[must_use]
pub fn window_size() -> Option<Size> {
    let mut ws = std::mem::MaybeUninit::<libc::winsize>::zeroed();
    // SAFETY: TIOCGWINSZ fills a `winsize`; the zeroed value is valid either way.
    let ok = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, ws.as_mut_ptr()) } == 0;
    let ws = unsafe { ws.assume_init() };
    (ok && ws.ws_row > 0 && ws.ws_col > 0).then(|| Size::new(ws.ws_row, ws.ws_col))
}

#[cfg(not(unix))]
#[must_use]
pub fn window_size() -> Option<Size> {
    None
}

/// Both stdin and stdout are terminals.
#[cfg(unix)]
#[must_use]
pub fn stdio_is_tty() -> bool {
    [libc::STDIN_FILENO, libc::STDOUT_FILENO]
        .into_iter()
        .all(|fd| unsafe { libc::isatty(fd) } == 1)
}

#[cfg(not(unix))]
#[must_use]
pub fn stdio_is_tty() -> bool {
    false
}

// ─── termios ────────────────────────────────────────────────────────────────

#[cfg(unix)]
mod termios {
    use std::io;
    use std::mem::MaybeUninit;
    use std::sync::Mutex;

    /// Settings to restore, visible to the panic hook.
    static SAVED: Mutex<Option<libc::termios>> = Mutex::new(None);

    fn check(ret: libc::c_int) -> io::Result<()> {
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// Put stdin in raw mode. Returns the settings it replaced.
    pub fn make_raw() -> io::Result<libc::termios> {
        let mut original = MaybeUninit::<libc::termios>::uninit();
        check(unsafe { libc::tcgetattr(libc::STDIN_FILENO, original.as_mut_ptr()) })?;
        // SAFETY: tcgetattr succeeded, so the struct is initialized.
        let original = unsafe { original.assume_init() };

        let mut settings = original;
        unsafe { libc::cfmakeraw(&raw mut settings) };
        // Reads block for one byte; `poll` decides when to read.
        settings.c_cc[libc::VMIN] = 1;
        settings.c_cc[libc::VTIME] = 0;
        check(unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const settings) })?;

        if let Ok(mut saved) = SAVED.lock() {
            *saved = Some(original);
        }
        Ok(original)
    }

    pub fn restore(original: &libc::termios) -> io::Result<()> {
        if let Ok(mut saved) = SAVED.lock() {
            *saved = None;
        }
        check(unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) })
    }

    /// Panic path. Skips the restore rather than wait on the lock.
    pub fn restore_saved() {
        let saved = SAVED.try_lock().ok().and_then(|saved| *saved);
        if let Some(original) = saved {
            unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw const original) };
        }
    }
}

// ─── Panic hook ─────────────────────────────────────────────────────────────

/// Every mode `enter` turns on, turned off. Alternate screen last so the
/// shell's screen comes back clean.
const PANIC_RESTORE: &str = concat!(
    "\x1b[?2026l", // synchronized output
    "\x1b[?2004l", // bracketed paste
    "\x1b[?1004l", // focus reports
    "\x1b[0m",
    "\x1b[?25h",
    "\x1b[?1049l",
);

static PANIC_HOOK: Once = Once::new();

/// Chain a terminal-restoring hook in front of the current panic hook.
/// Only the first call installs it.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            write_unlocked(PANIC_RESTORE.as_bytes());
            #[cfg(unix)]
            termios::restore_saved();
            previous(info);
        }));
    });
}

#[cfg(unix)]
fn write_unlocked(bytes: &[u8]) {
    // SAFETY: fd 1 outlives the process's Rust code; a short write is tolerated.
    unsafe { libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast(), bytes.len()) };
}

#[cfg(not(unix))]
fn write_unlocked(bytes: &[u8]) {
    let mut out = io::stdout();
    let _ = out.write_all(bytes).and_then(|()| out.flush());
}

// ─── RawTerminal ────────────────────────────────────────────────────────────

/// Mode state of the controlling terminal. Left on drop if still active.
pub struct RawTerminal {
    #[cfg(unix)]
    saved: Option<libc::termios>,
    size: Size,
    active: bool,
}

impl RawTerminal {
    /// Query the size (falling back to 24×80). Modes are untouched.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            saved: None,
            size: window_size().unwrap_or(Size::DEFAULT),
            active: false,
        }
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Ask the OS again, keeping the old size if it has no answer.
    pub fn refresh_size(&mut self) -> Size {
        self.size = window_size().unwrap_or(self.size);
        self.size
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Raw mode, alternate screen, hidden cursor, bracketed paste, focus
    /// reports.
    ///
    /// # Errors
    ///
    /// Fails if termios or the mode sequence cannot be written. Whatever was
    /// switched on is still undone by [`leave`](Self::leave).
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();

        #[cfg(unix)]
        {
            self.saved = Some(termios::make_raw()?);
        }
        self.active = true;

        let mut out = io::stdout().lock();
        ansi::set(&mut out, DecMode::AltScreen)?;
        ansi::unset(&mut out, DecMode::Cursor)?;
        ansi::clear_screen(&mut out)?;
        ansi::set(&mut out, DecMode::BracketedPaste)?;
        ansi::set(&mut out, DecMode::FocusReports)?;
        out.flush()?;

        tracing::debug!(rows = self.size.rows, cols = self.size.cols, "terminal entered raw mode");
        Ok(())
    }

    /// Undo [`enter`](Self::enter). Termios is restored even when the
    /// escape output fails; the first error is returned.
    ///
    /// # Errors
    ///
    /// Fails if the mode sequence cannot be written or termios restored.
    pub fn leave(&mut self) -> io::Result<()> {
        if !std::mem::take(&mut self.active) {
            return Ok(());
        }

        let written = Self::write_leave_sequence();
        #[cfg(unix)]
        let restored = self.saved.take().map_or(Ok(()), |t| termios::restore(&t));
        #[cfg(not(unix))]
        let restored = Ok(());

        tracing::debug!("terminal left raw mode");
        written.and(restored)
    }

    fn write_leave_sequence() -> io::Result<()> {
        let mut out = io::stdout().lock();
        ansi::unset(&mut out, DecMode::SyncOutput)?;
        ansi::unset(&mut out, DecMode::FocusReports)?;
        ansi::unset(&mut out, DecMode::BracketedPaste)?;
        ansi::reset_style(&mut out)?;
        ansi::set(&mut out, DecMode::Cursor)?;
        ansi::unset(&mut out, DecMode::AltScreen)?;
        out.flush()
    }
}

impl Default for RawTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            tracing::warn!(%err, "terminal not restored on drop");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
