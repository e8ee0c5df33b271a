// SPDX-License-Identifier: MIT
//
// The terminal adapter seam.
//
// The editor core never talks to a file descriptor. It sees a `TerminalIo`:
// raw-mode switches, a blocking event source, the viewport size and a place
// to put cells. `Tty` implements it for the real terminal and
// `ScriptedTerminal` for tests.
//
// `RawModeGuard` scopes raw mode. It enters on acquire and leaves exactly
// once: on `release()` for the normal path, or from `Drop` when an error or
// a panic unwinds through the loop.

use std::io;
use std::ops::{Deref, DerefMut};

use crate::cell::{CellWrite, Frame};
use crate::input::InputEvent;
use crate::terminal::Size;

/// Everything the editor needs from a terminal.
pub trait TerminalIo {
    /// Put the terminal in raw mode. Paired with [`leave_raw_mode`](Self::leave_raw_mode).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the mode switch fails.
    fn enter_raw_mode(&mut self) -> io::Result<()>;

    /// Restore the terminal to the state it had before raw mode.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the restore fails.
    fn leave_raw_mode(&mut self) -> io::Result<()>;

    /// Block until the next input event.
    ///
    /// # Errors
    ///
    /// Returns an error when input is closed or unreadable.
    fn read_event(&mut self) -> io::Result<InputEvent>;

    /// Current size in cells.
    fn viewport_size(&self) -> Size;

    /// Queue runs of text for output.
    ///
    /// # Errors
    ///
    /// Returns an error if the writes cannot be queued.
    fn write_cells(&mut self, cells: &[CellWrite]) -> io::Result<()>;

    /// Queue a full-screen clear.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear cannot be queued.
    fn clear(&mut self) -> io::Result<()>;

    /// Queue the hardware cursor position, or hide it with `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the move cannot be queued.
    fn place_cursor(&mut self, at: Option<(u16, u16)>) -> io::Result<()>;

    /// Send everything queued to the screen.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if writing fails.
    fn flush(&mut self) -> io::Result<()>;

    /// Apply one rendered frame: clear if requested, write the runs, place
    /// the cursor, flush.
    ///
    /// # Errors
    ///
    /// Propagates the first error from the steps above.
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        if frame.clear {
            self.clear()?;
        }
        self.write_cells(&frame.cells)?;
        self.place_cursor(frame.cursor)?;
        self.flush()
    }
}

// ─── RawModeGuard ───────────────────────────────────────────────────────────

/// Raw mode for the lifetime of the guard.
///
/// Dereferences to the terminal so the loop keeps using it while raw.
pub struct RawModeGuard<'a, T: TerminalIo + ?Sized> {
    term: &'a mut T,
    active: bool,
}

impl<'a, T: TerminalIo + ?Sized> RawModeGuard<'a, T> {
    /// Enter raw mode.
    ///
    /// # Errors
    ///
    /// Returns the error from [`TerminalIo::enter_raw_mode`]. Nothing needs
    /// restoring in that case and no guard is created.
    pub fn acquire(term: &'a mut T) -> io::Result<Self> {
        term.enter_raw_mode()?;
        Ok(Self { term, active: true })
    }

    /// Leave raw mode now and report how it went.
    ///
    /// # Errors
    ///
    /// Returns the error from [`TerminalIo::leave_raw_mode`]. The guard is
    /// spent either way; `Drop` will not try again.
    pub fn release(mut self) -> io::Result<()> {
        self.active = false;
        self.term.leave_raw_mode()
    }
}

impl<T: TerminalIo + ?Sized> Deref for RawModeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.term
    }
}

impl<T: TerminalIo + ?Sized> DerefMut for RawModeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.term
    }
}

impl<T: TerminalIo + ?Sized> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(err) = self.term.leave_raw_mode() {
                tracing::warn!(%err, "failed to leave raw mode during unwind");
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
