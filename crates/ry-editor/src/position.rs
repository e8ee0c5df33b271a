//! Positions and ranges in a buffer.
//!
//! Lines and columns start at 0. A column counts chars (Unicode scalar
//! values); display width is the renderer's business.
//!
//! `after_insert` and `after_delete` say where a position lands once some
//! other cursor's edit has gone through, which is how secondary cursors and
//! selection anchors stay put relative to their text.

use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A (line, column) place in the buffer. Valid columns run `0..=line_len`,
/// the last one being the append point. Ordered line first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const ZERO: Self = Self { line: 0, col: 0 };

    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Where this position ends up after text was inserted at `at`, the
    /// inserted text ending at `end`.
    ///
    /// Positions before `at` stay put. Positions at or after it move with
    /// the text that followed the insertion point.
    #[must_use]
    pub const fn after_insert(self, at: Self, end: Self) -> Self {
        if self.line < at.line || (self.line == at.line && self.col < at.col) {
            return self;
        }
        if self.line == at.line {
            Self::new(end.line, end.col + (self.col - at.col))
        } else {
            Self::new(self.line + (end.line - at.line), self.col)
        }
    }

    /// Where this position ends up after `range` was deleted.
    ///
    /// Positions inside the range collapse to its start; positions after it
    /// move back by the removed extent.
    #[must_use]
    pub const fn after_delete(self, range: Range) -> Self {
        let (start, end) = (range.start, range.end);
        if self.line < start.line || (self.line == start.line && self.col <= start.col) {
            return self;
        }
        if self.line < end.line || (self.line == end.line && self.col < end.col) {
            return start;
        }
        if self.line == end.line {
            Self::new(start.line, start.col + (self.col - end.col))
        } else {
            Self::new(self.line - (end.line - start.line), self.col)
        }
    }
}

/// `line:col`, counted from 1 like the status line.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Half-open `[start, end)`, never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// The range between `a` and `b`, whichever comes first.
    #[inline]
    #[must_use]
    pub fn ordered(a: Position, b: Position) -> Self {
        let (start, end) = if b < a { (b, a) } else { (a, b) };
        Self { start, end }
    }

    /// Empty, at `pos`.
    #[inline]
    #[must_use]
    pub const fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        let (s, e) = (self.start, self.end);
        s.line == e.line && s.col == e.col
    }

    /// `start <= pos < end`.
    #[inline]
    #[must_use]
    pub fn contains(self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
