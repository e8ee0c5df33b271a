// SPDX-License-Identifier: MIT
//
// Frame encoding.
//
// A frame is encoded into an `OutputBuffer` and leaves the process in one
// `write_all`, so the terminal never shows half a frame. `CellWriter`
// remembers where the terminal cursor ended up and which attributes are
// on; a run that starts where the last one stopped, in the same style,
// costs no escape bytes at all.
//
// `encode_frame` wraps the lot in a synchronized-output block: hide the
// cursor, optional clear, runs, reset, place the cursor, release.

use std::io::{self, Write};

use crate::ansi::{self, DecMode};
use crate::cell::{Attr, CellWrite, Frame};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// Typical full redraw of a large terminal fits without growing.
const FRAME_CAPACITY: usize = 16 * 1024;

/// Escape bytes for one frame.
#[derive(Debug)]
pub struct OutputBuffer(Vec<u8>);

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::with_capacity(FRAME_CAPACITY))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Drop pending bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Send everything to `w` and flush it. The buffer is empty afterwards
    /// even if the write fails, so a lost frame never leaks into the next.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        let sent = w.write_all(&self.0).and_then(|()| w.flush());
        self.0.clear();
        sent
    }

    fn push(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates; the bytes go out through [`OutputBuffer::flush_to`].
impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.push(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// What the terminal is known to look like between runs.
///
/// A cursor move is skipped when the run starts where the last one left
/// the cursor. A style change resets first unless nothing was on.
#[derive(Debug, Clone, Copy)]
pub struct CellWriter {
    /// Where the terminal cursor is after the last run, if known.
    at: Option<(u16, usize)>,
    attrs: Attr,
}

impl CellWriter {
    /// Nothing known.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at: None,
            attrs: Attr::empty(),
        }
    }

    /// After anything else touched the screen (clear, reset, raw-mode entry).
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Append `run` with the fewest escapes that get it there.
    pub fn write_run(&mut self, out: &mut OutputBuffer, run: &CellWrite) {
        if run.text.is_empty() {
            return;
        }

        if self.at != Some((run.row, usize::from(run.col))) {
            ansi::move_to(out, run.row, run.col).ok();
        }

        if run.attr != self.attrs {
            if !self.attrs.is_empty() {
                ansi::reset_style(out).ok();
            }
            ansi::style(out, run.attr).ok();
            self.attrs = run.attr;
        }

        out.push(run.text.as_bytes());
        self.at = Some((run.row, usize::from(run.col) + run.width()));
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Frame encoding ──────────────────────────────────────────────────────────

/// Encode a whole frame into `out`.
///
/// The output is wrapped in synchronized-output markers, always ends with
/// an attribute reset, and positions (or hides) the hardware cursor last.
pub fn encode_frame(out: &mut OutputBuffer, writer: &mut CellWriter, frame: &Frame) {
    ansi::set(out, DecMode::SyncOutput).ok();
    ansi::unset(out, DecMode::Cursor).ok();

    if frame.clear {
        ansi::reset_style(out).ok();
        ansi::clear_screen(out).ok();
        writer.reset_state();
    }

    for run in &frame.cells {
        writer.write_run(out, run);
    }

    // Leave the terminal with default attributes between frames.
    ansi::reset_style(out).ok();
    writer.reset_state();

    if let Some((row, col)) = frame.cursor {
        ansi::move_to(out, row, col).ok();
        ansi::set(out, DecMode::Cursor).ok();
    }

    ansi::unset(out, DecMode::SyncOutput).ok();
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(frame: &Frame) -> String {
        let mut out = OutputBuffer::new();
        let mut writer = CellWriter::new();
        encode_frame(&mut out, &mut writer, frame);
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn buffer_collects_then_sends_once() {
        let mut buf = OutputBuffer::new();
        assert!(buf.is_empty());
        write!(buf, "row {}", 3).unwrap();
        buf.write_all(b"!").unwrap();
        assert_eq!(buf.len(), 6);

        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"row 3!");
        assert!(buf.is_empty());

        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink.len(), 6);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_send_still_empties_buffer() {
        let mut buf = OutputBuffer::new();
        buf.write_all(b"frame").unwrap();
        assert!(buf.flush_to(&mut Broken).is_err());
        assert!(buf.is_empty());
    }

    // ── CellWriter ──────────────────────────────────────────────────────

    #[test]
    fn first_run_positions_cursor() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::plain(2, 3, "hi"));
        assert_eq!(out.as_bytes(), b"\x1b[3;4Hhi");
    }

    #[test]
    fn adjacent_runs_skip_cursor_move() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::plain(0, 0, "ab"));
        w.write_run(&mut out, &CellWrite::plain(0, 2, "cd"));
        assert_eq!(out.as_bytes(), b"\x1b[1;1Habcd");
    }

    #[test]
    fn wide_chars_advance_two_columns() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::plain(0, 0, "中"));
        w.write_run(&mut out, &CellWrite::plain(0, 2, "x"));
        assert_eq!(out.as_bytes(), "\x1b[1;1H中x".as_bytes());
    }

    #[test]
    fn gap_between_runs_moves_cursor() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::plain(0, 0, "a"));
        w.write_run(&mut out, &CellWrite::plain(0, 5, "b"));
        assert_eq!(out.as_bytes(), b"\x1b[1;1Ha\x1b[1;6Hb");
    }

    #[test]
    fn attr_change_resets_then_emits() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::styled(0, 0, "a", Attr::INVERSE));
        w.write_run(&mut out, &CellWrite::plain(0, 1, "b"));
        assert_eq!(out.as_bytes(), b"\x1b[1;1H\x1b[7ma\x1b[0mb");
    }

    #[test]
    fn empty_run_is_skipped() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.write_run(&mut out, &CellWrite::plain(0, 0, ""));
        assert!(out.is_empty());
    }

    // ── encode_frame ────────────────────────────────────────────────────

    #[test]
    fn frame_is_synchronized() {
        let s = encode(&Frame::default());
        assert!(s.starts_with("\x1b[?2026h"));
        assert!(s.ends_with("\x1b[?2026l"));
    }

    #[test]
    fn clear_frame_clears_screen() {
        let s = encode(&Frame {
            clear: true,
            ..Frame::default()
        });
        assert!(s.contains("\x1b[2J"));
    }

    #[test]
    fn partial_frame_does_not_clear() {
        let s = encode(&Frame {
            cells: vec![CellWrite::plain(0, 0, "x")],
            ..Frame::default()
        });
        assert!(!s.contains("\x1b[2J"));
        assert!(s.contains("\x1b[1;1Hx"));
    }

    #[test]
    fn cursor_is_placed_and_shown_last() {
        let s = encode(&Frame {
            cells: vec![CellWrite::plain(0, 0, "x")],
            cursor: Some((3, 7)),
            ..Frame::default()
        });
        assert!(s.ends_with("\x1b[4;8H\x1b[?25h\x1b[?2026l"));
    }

    #[test]
    fn no_cursor_stays_hidden() {
        let s = encode(&Frame::default());
        assert!(s.contains("\x1b[?25l"));
        assert!(!s.contains("\x1b[?25h"));
    }
}
