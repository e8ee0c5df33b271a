//! Text buffer — the fundamental unit of text storage.
//!
//! A `Buffer` is an ordered sequence of lines held in a [`LineStore`] (a gap
//! buffer of `String`s). Lines never contain a terminator; the terminator is
//! a property of the whole buffer ([`LineEnding`]) and only appears when the
//! buffer is serialized.
//!
//! # Design choices
//!
//! - **Line-oriented storage.** Indexing a line is O(1), editing inside a
//!   line is O(line length), splitting or joining lines near the previous
//!   edit is O(1) amortized. No keystroke rewrites the whole file.
//!
//! - **Columns are char offsets**, not byte offsets. Conversion happens at
//!   the edge with `ropey::str_utils`, so byte offsets never leak into the
//!   public API.
//!
//! - **At least one line, always.** An empty file is one empty line.
//!
//! - **Every edit is all-or-nothing.** Positions are validated before any
//!   line is touched, and each mutation bumps `version`. Saves compare
//!   versions to detect edits that raced a write.

use std::fmt;

use ropey::str_utils::char_to_byte_idx;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EditError, SaveError};
use crate::lines::LineStore;
use crate::position::{Position, Range};

// ---------------------------------------------------------------------------
// Line ending detection
// ---------------------------------------------------------------------------

/// Line ending style of a buffer.
///
/// Detected on load from the first terminator. Defaults to `Lf` for new
/// buffers. Used by [`Buffer::serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n` — Unix, macOS, Linux.
    #[default]
    Lf,
    /// `\r\n` — Windows, DOS.
    CrLf,
    /// `\r` — Classic Mac.
    Cr,
}

impl LineEnding {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// The style of the first terminator in `text`, `Lf` if there is none.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let bytes = text.as_bytes();
        for (i, &byte) in bytes.iter().enumerate() {
            match byte {
                b'\n' => return Self::Lf,
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => return Self::CrLf,
                b'\r' => return Self::Cr,
                _ => {}
            }
        }
        Self::Lf
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => f.write_str("LF"),
            Self::CrLf => f.write_str("CRLF"),
            Self::Cr => f.write_str("CR"),
        }
    }
}

/// Split `text` on every terminator (`\r\n`, `\r`, `\n`).
///
/// Always yields at least one piece: `"a\n"` is `["a", ""]`.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                pieces.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                pieces.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(&text[start..]);
    pieces
}

/// Decode UTF-8, replacing each invalid sequence with U+FFFD and counting
/// them.
fn decode_lossy(bytes: &[u8]) -> (String, Option<DecodeError>) {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    let mut offset = 0;
    let mut invalid = 0;
    let mut first_offset = None;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(err) => {
                let good = err.valid_up_to();
                // `good` bytes were just validated.
                out.push_str(std::str::from_utf8(&rest[..good]).unwrap_or_default());
                out.push(char::REPLACEMENT_CHARACTER);
                invalid += 1;
                first_offset.get_or_insert(offset + good);

                let skip = good + err.error_len().unwrap_or(rest.len() - good);
                offset += skip;
                rest = &rest[skip..];
            }
        }
    }

    let error = first_offset.map(|first_offset| DecodeError {
        invalid,
        first_offset,
    });
    (out, error)
}

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable copy of the buffer taken at save time.
///
/// The write works from the snapshot, never from the live buffer. When it
/// completes, [`Buffer::commit_save`] checks the version still matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    lines: Vec<String>,
    line_ending: LineEnding,
    version: u64,
}

impl Snapshot {
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// File bytes: lines joined by the line ending.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        self.lines.join(self.line_ending.as_str()).into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Editable, line-oriented text.
///
/// # Coordinate system
///
/// Positions are 0-indexed `(line, col)` pairs; `col` counts chars and may
/// equal the line length (the append position). See
/// [`is_valid`](Self::is_valid).
pub struct Buffer {
    lines: LineStore,
    line_ending: LineEnding,
    version: u64,
    modified: bool,
}

impl Buffer {
    /// One empty line, `Lf` endings, unmodified.
    #[must_use]
    pub fn new() -> Self {
        Self::with_line_ending(LineEnding::Lf)
    }

    /// One empty line that will be saved with `ending`.
    #[must_use]
    pub fn with_line_ending(ending: LineEnding) -> Self {
        Self::with_lines(vec![String::new()], ending)
    }

    /// Build a buffer from text already in memory. Terminators split lines;
    /// the first one found sets the line ending.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let lines = split_lines(text).into_iter().map(str::to_owned).collect();
        Self::with_lines(lines, LineEnding::detect(text))
    }

    /// Decode raw file bytes.
    ///
    /// Invalid UTF-8 never aborts the load: each bad sequence becomes
    /// U+FFFD and the returned [`DecodeError`] says how many there were.
    #[must_use]
    pub fn load(bytes: &[u8]) -> (Self, Option<DecodeError>) {
        let (text, error) = decode_lossy(bytes);
        if let Some(err) = &error {
            tracing::warn!(%err, "decoded with replacement characters");
        }
        (Self::from_text(&text), error)
    }

    fn with_lines(lines: Vec<String>, line_ending: LineEnding) -> Self {
        debug_assert!(!lines.is_empty());
        Self {
            lines: LineStore::new(lines),
            line_ending,
            version: 0,
            modified: false,
        }
    }

    /// File bytes: lines joined by the buffer's line ending.
    ///
    /// `load(serialize())` reproduces the same lines.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let sep = self.line_ending.as_str();
        let mut out = String::with_capacity(self.len_chars());
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            out.push_str(line);
        }
        out.into_bytes()
    }

    // -- Queries ------------------------------------------------------------

    /// Number of lines. Never zero.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of line `i`, without terminator.
    #[inline]
    #[must_use]
    pub fn line(&self, i: usize) -> Option<&str> {
        self.lines.get(i).map(String::as_str)
    }

    /// Length of line `i` in chars; 0 for lines past the end.
    #[must_use]
    pub fn line_len(&self, i: usize) -> usize {
        self.line(i).map_or(0, char_len)
    }

    /// All lines in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(String::as_str)
    }

    /// Total chars, counting one per line break.
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.lines().map(char_len).sum::<usize>() + self.line_count() - 1
    }

    /// The char at `pos`, or `None` at a line end or outside the buffer.
    #[must_use]
    pub fn char_at(&self, pos: Position) -> Option<char> {
        self.line(pos.line)?.chars().nth(pos.col)
    }

    /// The append position after the last character.
    #[must_use]
    pub fn end_position(&self) -> Position {
        let last = self.line_count() - 1;
        Position::new(last, self.line_len(last))
    }

    /// Whether `pos` addresses a line that exists and a column within
    /// `0..=line_len`.
    #[must_use]
    pub fn is_valid(&self, pos: Position) -> bool {
        pos.line < self.line_count() && pos.col <= self.line_len(pos.line)
    }

    /// Nearest valid position: the line is clamped first, then the column
    /// to that line's length. Idempotent.
    #[must_use]
    pub fn clamp_position(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count() - 1);
        Position::new(line, pos.col.min(self.line_len(line)))
    }

    fn check(&self, pos: Position) -> Result<(), EditError> {
        if self.is_valid(pos) {
            Ok(())
        } else {
            Err(EditError::OutOfBounds {
                pos,
                lines: self.line_count(),
            })
        }
    }

    /// Byte index of char column `col` in line `line`. The line must exist.
    fn byte_col(&self, line: usize, col: usize) -> usize {
        self.line(line).map_or(0, |text| char_to_byte_idx(text, col))
    }

    // -- Metadata -----------------------------------------------------------

    /// Bumped by every mutation.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Changed since load or the last committed save.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Change the terminator used on save. Counts as a modification.
    pub fn set_line_ending(&mut self, ending: LineEnding) {
        if self.line_ending != ending {
            self.line_ending = ending;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.modified = true;
    }

    // -- Editing ------------------------------------------------------------

    /// Insert `text` at `pos` and return the position right after it.
    ///
    /// Any terminator in `text` (`\n`, `\r\n`, `\r`) splits the line.
    ///
    /// # Errors
    ///
    /// [`EditError::OutOfBounds`] if `pos` is not valid; the buffer is left
    /// untouched.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<Position, EditError> {
        self.check(pos)?;
        if text.is_empty() {
            return Ok(pos);
        }

        let pieces = split_lines(text);
        let at = self.byte_col(pos.line, pos.col);
        let Some(line) = self.lines.get_mut(pos.line) else {
            return Err(EditError::OutOfBounds {
                pos,
                lines: self.line_count(),
            });
        };

        let end = if let [only] = pieces.as_slice() {
            line.insert_str(at, only);
            Position::new(pos.line, pos.col + char_len(only))
        } else {
            let tail = line.split_off(at);
            line.push_str(pieces[0]);

            let last = pieces.len() - 1;
            for (k, piece) in pieces.iter().enumerate().skip(1) {
                let mut new_line = (*piece).to_owned();
                if k == last {
                    new_line.push_str(&tail);
                }
                self.lines.insert(pos.line + k, new_line);
            }
            Position::new(pos.line + last, char_len(pieces[last]))
        };

        self.touch();
        Ok(end)
    }

    /// Remove the text in `range` (either endpoint order) and return it,
    /// line breaks as `\n`.
    ///
    /// # Errors
    ///
    /// [`EditError::OutOfBounds`] if either endpoint is invalid; the buffer
    /// is left untouched.
    pub fn delete(&mut self, range: Range) -> Result<String, EditError> {
        self.check(range.start)?;
        self.check(range.end)?;
        let Range { start, end } = Range::ordered(range.start, range.end);
        if start == end {
            return Ok(String::new());
        }

        let from = self.byte_col(start.line, start.col);
        let to = self.byte_col(end.line, end.col);

        let removed = if start.line == end.line {
            let Some(line) = self.lines.get_mut(start.line) else {
                return Ok(String::new());
            };
            line.drain(from..to).collect()
        } else {
            // Lift out lines start+1..=end; the gap stays parked after `start`.
            let mut middle = Vec::with_capacity(end.line - start.line);
            for _ in start.line..end.line {
                if let Some(line) = self.lines.remove(start.line + 1) {
                    middle.push(line);
                }
            }
            let Some(head) = self.lines.get_mut(start.line) else {
                return Ok(String::new());
            };

            let mut removed = head.split_off(from);
            let last = middle.len() - 1;
            for (k, line) in middle.iter().enumerate() {
                removed.push('\n');
                if k == last {
                    removed.push_str(&line[..to]);
                    head.push_str(&line[to..]);
                } else {
                    removed.push_str(line);
                }
            }
            removed
        };

        self.touch();
        Ok(removed)
    }

    // -- Saving -------------------------------------------------------------

    /// Freeze the current content for a save.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.lines.to_vec(),
            line_ending: self.line_ending,
            version: self.version,
        }
    }

    /// Mark the buffer saved as of `snapshot`.
    ///
    /// # Errors
    ///
    /// [`SaveError::Conflict`] if the buffer was edited after the snapshot
    /// was taken; it stays modified.
    pub fn commit_save(&mut self, snapshot: &Snapshot) -> Result<(), SaveError> {
        if snapshot.version != self.version {
            return Err(SaveError::Conflict {
                saved: snapshot.version,
                current: self.version,
            });
        }
        self.modified = false;
        Ok(())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.line_count())
            .field("line_ending", &self.line_ending)
            .field("version", &self.version)
            .field("modified", &self.modified)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn lines(b: &Buffer) -> Vec<&str> {
        b.lines().collect()
    }

    fn buf(ls: &[&str]) -> Buffer {
        Buffer::from_text(&ls.join("\n"))
    }

    // -- LineEnding ---------------------------------------------------------

    #[test]
    fn line_ending_detect() {
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\r\nb"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\rb"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("none"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\nb\r\nc"), LineEnding::Lf);
    }

    #[test]
    fn line_ending_display() {
        assert_eq!(LineEnding::CrLf.to_string(), "CRLF");
    }

    #[test]
    fn split_lines_handles_all_terminators() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), ["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), ["a", ""]);
        assert_eq!(split_lines(""), [""]);
        assert_eq!(split_lines("\r\n"), ["", ""]);
    }

    // -- Load / serialize ---------------------------------------------------

    #[test]
    fn new_buffer_has_one_empty_line() {
        let b = Buffer::new();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0), Some(""));
        assert!(!b.is_modified());
    }

    #[test]
    fn load_splits_lines() {
        let (b, err) = Buffer::load(b"ab\nc");
        assert!(err.is_none());
        assert_eq!(lines(&b), ["ab", "c"]);
    }

    #[test]
    fn load_preserves_crlf_on_serialize() {
        let (b, _) = Buffer::load(b"one\r\ntwo\r\n");
        assert_eq!(b.line_ending(), LineEnding::CrLf);
        assert_eq!(lines(&b), ["one", "two", ""]);
        assert_eq!(b.serialize(), b"one\r\ntwo\r\n");
    }

    #[test]
    fn load_replaces_invalid_utf8() {
        let (b, err) = Buffer::load(b"ok\xff\xfeend");
        assert_eq!(b.line(0), Some("ok\u{FFFD}\u{FFFD}end"));
        assert_eq!(
            err,
            Some(DecodeError {
                invalid: 2,
                first_offset: 2
            })
        );
    }

    #[test]
    fn load_truncated_utf8_at_end() {
        let (b, err) = Buffer::load(b"ab\xe4\xb8");
        assert_eq!(b.line(0), Some("ab\u{FFFD}"));
        assert_eq!(err.map(|e| e.first_offset), Some(2));
    }

    #[test]
    fn serialize_empty_buffer_is_empty() {
        assert!(Buffer::new().serialize().is_empty());
    }

    // -- Queries ------------------------------------------------------------

    #[test]
    fn queries() {
        let b = buf(&["héllo", "", "x"]);
        assert_eq!(b.line_len(0), 5);
        assert_eq!(b.line_len(9), 0);
        assert_eq!(b.char_at(p(0, 1)), Some('é'));
        assert_eq!(b.char_at(p(0, 5)), None);
        assert_eq!(b.end_position(), p(2, 1));
        assert_eq!(b.len_chars(), 5 + 0 + 1 + 2);
        assert!(b.is_valid(p(0, 5)));
        assert!(!b.is_valid(p(0, 6)));
        assert!(!b.is_valid(p(3, 0)));
    }

    #[test]
    fn clamp_position_clamps_line_then_col() {
        let b = buf(&["abc", "d"]);
        assert_eq!(b.clamp_position(p(0, 9)), p(0, 3));
        assert_eq!(b.clamp_position(p(7, 7)), p(1, 1));
        assert_eq!(b.clamp_position(p(1, 0)), p(1, 0));
    }

    // -- Insert -------------------------------------------------------------

    #[test]
    fn insert_char_mid_line() {
        // ["ab","c"], insert "X" at (0,2) → ["abX","c"], end (0,3).
        let mut b = buf(&["ab", "c"]);
        let end = b.insert(p(0, 2), "X").unwrap();
        assert_eq!(lines(&b), ["abX", "c"]);
        assert_eq!(end, p(0, 3));
    }

    #[test]
    fn insert_newline_splits_line() {
        let mut b = buf(&["hello"]);
        let end = b.insert(p(0, 2), "\n").unwrap();
        assert_eq!(lines(&b), ["he", "llo"]);
        assert_eq!(end, p(1, 0));
    }

    #[test]
    fn insert_multiline_text() {
        let mut b = buf(&["[]", "z"]);
        let end = b.insert(p(0, 1), "a\r\nb\rc").unwrap();
        assert_eq!(lines(&b), ["[a", "b", "c]", "z"]);
        assert_eq!(end, p(2, 1));
    }

    #[test]
    fn insert_unicode_uses_char_columns() {
        let mut b = buf(&["日本"]);
        b.insert(p(0, 1), "x").unwrap();
        assert_eq!(b.line(0), Some("日x本"));
    }

    #[test]
    fn insert_out_of_bounds_fails_without_change() {
        let mut b = buf(&["ab"]);
        assert_eq!(
            b.insert(p(0, 3), "x"),
            Err(EditError::OutOfBounds {
                pos: p(0, 3),
                lines: 1
            })
        );
        assert!(b.insert(p(1, 0), "x").is_err());
        assert_eq!(lines(&b), ["ab"]);
        assert_eq!(b.version(), 0);
        assert!(!b.is_modified());
    }

    #[test]
    fn insert_empty_text_is_not_a_change() {
        let mut b = buf(&["ab"]);
        assert_eq!(b.insert(p(0, 1), ""), Ok(p(0, 1)));
        assert_eq!(b.version(), 0);
    }

    // -- Delete -------------------------------------------------------------

    #[test]
    fn delete_within_line() {
        // ["abc"], delete (0,2)..(0,3) → ["ab"].
        let mut b = buf(&["abc"]);
        let removed = b.delete(Range::ordered(p(0, 2), p(0, 3))).unwrap();
        assert_eq!(removed, "c");
        assert_eq!(lines(&b), ["ab"]);
    }

    #[test]
    fn delete_line_break_joins() {
        let mut b = buf(&["ab", "cd"]);
        let removed = b.delete(Range::ordered(p(1, 0), p(0, 2))).unwrap();
        assert_eq!(removed, "\n");
        assert_eq!(lines(&b), ["abcd"]);
    }

    #[test]
    fn delete_across_many_lines() {
        let mut b = buf(&["one", "two", "three", "four"]);
        let removed = b.delete(Range::ordered(p(0, 1), p(2, 2))).unwrap();
        assert_eq!(removed, "ne\ntwo\nth");
        assert_eq!(lines(&b), ["oree", "four"]);
    }

    #[test]
    fn delete_everything_leaves_one_line() {
        let mut b = buf(&["a", "b", "c"]);
        let end = b.end_position();
        b.delete(Range::ordered(Position::ZERO, end)).unwrap();
        assert_eq!(lines(&b), [""]);
        assert_eq!(b.line_count(), 1);
    }

    #[test]
    fn delete_invalid_endpoint_fails_without_change() {
        let mut b = buf(&["ab"]);
        assert!(b.delete(Range::ordered(p(0, 0), p(0, 5))).is_err());
        assert_eq!(lines(&b), ["ab"]);
        assert_eq!(b.version(), 0);
    }

    #[test]
    fn delete_empty_range_is_noop() {
        let mut b = buf(&["ab"]);
        assert_eq!(b.delete(Range::point(p(0, 1))), Ok(String::new()));
        assert_eq!(b.version(), 0);
    }

    // -- Versioning & saves -------------------------------------------------

    #[test]
    fn mutations_bump_version_and_mark_modified() {
        let mut b = buf(&["a"]);
        b.insert(p(0, 1), "b").unwrap();
        b.delete(Range::ordered(p(0, 0), p(0, 1))).unwrap();
        assert_eq!(b.version(), 2);
        assert!(b.is_modified());
    }

    #[test]
    fn commit_save_clears_modified() {
        let mut b = buf(&["a"]);
        b.insert(p(0, 1), "b").unwrap();
        let snap = b.snapshot();
        assert_eq!(snap.serialize(), b"ab");
        b.commit_save(&snap).unwrap();
        assert!(!b.is_modified());
    }

    #[test]
    fn commit_save_rejects_stale_snapshot() {
        let mut b = buf(&["a"]);
        b.insert(p(0, 1), "b").unwrap();
        let snap = b.snapshot();
        b.insert(p(0, 2), "c").unwrap();
        let err = b.commit_save(&snap).unwrap_err();
        assert!(matches!(err, SaveError::Conflict { saved: 1, current: 2 }));
        assert!(b.is_modified());
    }

    #[test]
    fn set_line_ending_marks_modified() {
        let mut b = buf(&["a", "b"]);
        b.set_line_ending(LineEnding::CrLf);
        assert!(b.is_modified());
        assert_eq!(b.serialize(), b"a\r\nb");
        let v = b.version();
        b.set_line_ending(LineEnding::CrLf);
        assert_eq!(b.version(), v);
    }

    // -- Properties ---------------------------------------------------------

    fn line_text() -> impl Strategy<Value = String> {
        "[a-zé中 \t]{0,12}"
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize, usize, String),
        Delete(usize, usize, usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, 0..15usize, "[a-z\n]{0,5}").prop_map(|(l, c, t)| Op::Insert(l, c, t)),
            (0..6usize, 0..15usize, 0..6usize, 0..15usize)
                .prop_map(|(a, b, c, d)| Op::Delete(a, b, c, d)),
        ]
    }

    proptest! {
        #[test]
        fn serialize_load_round_trip(
            ls in prop::collection::vec(line_text(), 1..8),
            ending in prop_oneof![Just(LineEnding::Lf), Just(LineEnding::CrLf), Just(LineEnding::Cr)],
        ) {
            let mut b = Buffer::from_text(&ls.join("\n"));
            b.set_line_ending(ending);
            let once = b.serialize();
            let (reloaded, err) = Buffer::load(&once);
            prop_assert!(err.is_none());
            prop_assert_eq!(reloaded.serialize(), once);
            prop_assert_eq!(reloaded.lines().collect::<Vec<_>>(), ls.iter().map(String::as_str).collect::<Vec<_>>());
        }

        #[test]
        fn line_count_never_zero(ops in prop::collection::vec(op(), 0..40)) {
            let mut b = Buffer::from_text("seed\ntext");
            for op in ops {
                match op {
                    Op::Insert(l, c, t) => {
                        let at = b.clamp_position(p(l, c));
                        b.insert(at, &t).unwrap();
                    }
                    Op::Delete(l1, c1, l2, c2) => {
                        let a = b.clamp_position(p(l1, c1));
                        let z = b.clamp_position(p(l2, c2));
                        b.delete(Range::ordered(a, z)).unwrap();
                    }
                }
                prop_assert!(b.line_count() >= 1);
            }
        }

        #[test]
        fn clamp_is_idempotent(
            ls in prop::collection::vec(line_text(), 1..6),
            l in 0..10usize,
            c in 0..20usize,
        ) {
            let b = Buffer::from_text(&ls.join("\n"));
            let once = b.clamp_position(p(l, c));
            prop_assert!(b.is_valid(once));
            prop_assert_eq!(b.clamp_position(once), once);
        }

        #[test]
        fn insert_then_delete_restores(
            ls in prop::collection::vec(line_text(), 1..6),
            l in 0..6usize,
            c in 0..15usize,
            text in "[a-z\n]{1,8}",
        ) {
            let mut b = Buffer::from_text(&ls.join("\n"));
            let before = b.serialize();
            let at = b.clamp_position(p(l, c));
            let end = b.insert(at, &text).unwrap();
            let removed = b.delete(Range::ordered(at, end)).unwrap();
            prop_assert_eq!(removed, text);
            prop_assert_eq!(b.serialize(), before);
        }
    }
}
