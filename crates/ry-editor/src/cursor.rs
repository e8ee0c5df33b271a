//! Cursor — position tracking with movement and selection.
//!
//! A [`Cursor`] is a position, a sticky column for vertical movement, and an
//! optional selection anchor. It never touches the buffer; the buffer is
//! passed in to bound movement.
//!
//! A [`CursorSet`] holds one or more cursors with one of them primary. The
//! set stays sorted by position and merges cursors that land on the same
//! spot. When one cursor edits the buffer, the others are shifted with
//! [`Position::after_insert`] / [`Position::after_delete`] so every cursor
//! keeps pointing at the same text.
//!
//! # Sticky column
//!
//! Moving up or down remembers the column the cursor started from. Passing
//! through a short line clamps the column; reaching a long line again snaps
//! back to the remembered column. Every other movement resets it.

use crate::buffer::Buffer;
use crate::position::{Position, Range};
use crate::word;

/// Cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    /// Wraps to the end of the previous line at column 0.
    Left,
    /// Wraps to the start of the next line at the line end.
    Right,
    LineStart,
    LineEnd,
    /// Start of the previous word. See [`crate::word`].
    WordLeft,
    /// Start of the next word.
    WordRight,
    BufferStart,
    BufferEnd,
}

/// Up or down, for page scrolling and adding cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertical {
    Up,
    Down,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Anchor (where the selection started) and active end (where the cursor
/// is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    /// The selected text as an ordered range.
    #[must_use]
    pub fn range(self) -> Range {
        Range::ordered(self.anchor, self.active)
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// A cursor in a text buffer. Lightweight value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pos: Position,
    sticky_col: usize,
    anchor: Option<Position>,
}

impl Cursor {
    /// A cursor at `pos` with no selection.
    #[must_use]
    pub const fn at(pos: Position) -> Self {
        Self {
            pos,
            sticky_col: pos.col,
            anchor: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    #[must_use]
    pub const fn line(&self) -> usize {
        self.pos.line
    }

    #[inline]
    #[must_use]
    pub const fn col(&self) -> usize {
        self.pos.col
    }

    #[inline]
    #[must_use]
    pub const fn anchor(&self) -> Option<Position> {
        self.anchor
    }

    /// The selection, if the anchor is set and differs from the position.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.anchor
            .filter(|&anchor| anchor != self.pos)
            .map(|anchor| Selection {
                anchor,
                active: self.pos,
            })
    }

    /// Start a selection at the current position.
    pub const fn set_anchor(&mut self) {
        self.anchor = Some(self.pos);
    }

    pub const fn clear_anchor(&mut self) {
        self.anchor = None;
    }

    /// Jump to `pos` (assumed valid), dropping any selection.
    pub const fn place(&mut self, pos: Position) {
        *self = Self::at(pos);
    }

    // -- Movement -----------------------------------------------------------

    /// The cursor after moving one step in `dir`. The selection is dropped.
    #[must_use]
    pub fn moved(&self, dir: Direction, buf: &Buffer) -> Self {
        let mut next = self.step(dir, buf);
        next.anchor = None;
        next
    }

    /// The cursor after moving one step in `dir`, extending the selection
    /// from the current anchor (or from here, if there is none).
    #[must_use]
    pub fn extended(&self, dir: Direction, buf: &Buffer) -> Self {
        let mut next = self.step(dir, buf);
        next.anchor = Some(self.anchor.unwrap_or(self.pos));
        next
    }

    /// The cursor `count` lines up or down, keeping the sticky column.
    /// Stops at the first or last line. The selection is dropped.
    #[must_use]
    pub fn moved_lines(&self, dir: Vertical, count: usize, buf: &Buffer) -> Self {
        let last = buf.line_count() - 1;
        let line = match dir {
            Vertical::Up => self.pos.line.saturating_sub(count),
            Vertical::Down => self.pos.line.saturating_add(count).min(last),
        };
        Self {
            pos: Position::new(line, self.sticky_col.min(buf.line_len(line))),
            sticky_col: self.sticky_col,
            anchor: None,
        }
    }

    fn step(&self, dir: Direction, buf: &Buffer) -> Self {
        let Position { line, col } = buf.clamp_position(self.pos);
        let last = buf.line_count() - 1;

        let pos = match dir {
            Direction::Up | Direction::Down => {
                let target = match dir {
                    Direction::Up => line.checked_sub(1),
                    _ => (line < last).then_some(line + 1),
                };
                return match target {
                    Some(t) => Self {
                        pos: Position::new(t, self.sticky_col.min(buf.line_len(t))),
                        sticky_col: self.sticky_col,
                        anchor: self.anchor,
                    },
                    None => Self {
                        pos: Position::new(line, col),
                        ..*self
                    },
                };
            }
            Direction::Left if col > 0 => Position::new(line, col - 1),
            Direction::Left if line > 0 => Position::new(line - 1, buf.line_len(line - 1)),
            Direction::Left => Position::new(line, col),
            Direction::Right if col < buf.line_len(line) => Position::new(line, col + 1),
            Direction::Right if line < last => Position::new(line + 1, 0),
            Direction::Right => Position::new(line, col),
            Direction::LineStart => Position::new(line, 0),
            Direction::LineEnd => Position::new(line, buf.line_len(line)),
            Direction::WordLeft => word::word_backward(buf, Position::new(line, col)),
            Direction::WordRight => word::word_forward(buf, Position::new(line, col)),
            Direction::BufferStart => Position::ZERO,
            Direction::BufferEnd => buf.end_position(),
        };

        Self {
            pos,
            sticky_col: pos.col,
            anchor: self.anchor,
        }
    }

    // -- Maintenance --------------------------------------------------------

    /// Re-validate the position and anchor against `buf`. A cursor already
    /// in bounds is left exactly as it was.
    pub fn clamp(&mut self, buf: &Buffer) {
        self.pos = buf.clamp_position(self.pos);
        self.anchor = self.anchor.map(|a| buf.clamp_position(a));
    }

    /// Follow an insertion made elsewhere.
    pub fn shift_after_insert(&mut self, at: Position, end: Position) {
        let before = self.pos;
        self.pos = self.pos.after_insert(at, end);
        self.anchor = self.anchor.map(|a| a.after_insert(at, end));
        if self.pos != before {
            self.sticky_col = self.pos.col;
        }
    }

    /// Follow a deletion made elsewhere.
    pub fn shift_after_delete(&mut self, range: Range) {
        let before = self.pos;
        self.pos = self.pos.after_delete(range);
        self.anchor = self.anchor.map(|a| a.after_delete(range));
        if self.pos != before {
            self.sticky_col = self.pos.col;
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::at(Position::ZERO)
    }
}

// ---------------------------------------------------------------------------
// CursorSet
// ---------------------------------------------------------------------------

/// One or more cursors, sorted by position, one of them primary.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorSet {
    cursors: Vec<Cursor>,
    primary: usize,
}

impl CursorSet {
    /// A set with a single cursor.
    #[must_use]
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursors: vec![cursor],
            primary: 0,
        }
    }

    #[must_use]
    pub fn primary(&self) -> &Cursor {
        &self.cursors[self.primary]
    }

    pub fn primary_mut(&mut self) -> &mut Cursor {
        &mut self.cursors[self.primary]
    }

    #[must_use]
    pub const fn primary_index(&self) -> usize {
        self.primary
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// A set is never empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Cursors in position order.
    pub fn iter(&self) -> impl Iterator<Item = &Cursor> + '_ {
        self.cursors.iter()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Cursor> {
        self.cursors.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut Cursor> {
        self.cursors.get_mut(i)
    }

    /// Add a cursor and make it primary. Merges if another cursor is
    /// already there.
    pub fn add(&mut self, cursor: Cursor) {
        self.cursors.push(cursor);
        self.primary = self.cursors.len() - 1;
        self.normalize();
    }

    /// Drop every cursor but the primary, and the primary's selection.
    pub fn collapse(&mut self) {
        let mut keep = self.cursors[self.primary];
        keep.clear_anchor();
        self.cursors = vec![keep];
        self.primary = 0;
    }

    /// Replace every cursor by `f(cursor)`, then re-sort and merge.
    pub fn map(&mut self, mut f: impl FnMut(&Cursor) -> Cursor) {
        for c in &mut self.cursors {
            *c = f(c);
        }
        self.normalize();
    }

    /// Shift every cursor except `skip` after an insertion.
    pub fn shift_after_insert(&mut self, skip: usize, at: Position, end: Position) {
        for (i, c) in self.cursors.iter_mut().enumerate() {
            if i != skip {
                c.shift_after_insert(at, end);
            }
        }
    }

    /// Shift every cursor except `skip` after a deletion.
    pub fn shift_after_delete(&mut self, skip: usize, range: Range) {
        for (i, c) in self.cursors.iter_mut().enumerate() {
            if i != skip {
                c.shift_after_delete(range);
            }
        }
    }

    /// Re-validate every cursor against `buf`, then re-sort and merge.
    pub fn clamp(&mut self, buf: &Buffer) {
        for c in &mut self.cursors {
            c.clamp(buf);
        }
        self.normalize();
    }

    /// Sort by position and merge cursors sharing a position. The primary
    /// survives a merge.
    pub fn normalize(&mut self) {
        let primary_pos = self.cursors[self.primary].position();
        let primary = self.cursors[self.primary];

        self.cursors.sort_by_key(Cursor::position);
        self.cursors.dedup_by_key(|c| c.position());

        self.primary = self
            .cursors
            .iter()
            .position(|c| c.position() == primary_pos)
            .unwrap_or(0);
        // Dedup keeps the first of a run; make sure it is the primary itself.
        self.cursors[self.primary] = primary;
    }
}

impl Default for CursorSet {
    fn default() -> Self {
        Self::new(Cursor::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn buf(ls: &[&str]) -> Buffer {
        Buffer::from_text(&ls.join("\n"))
    }

    fn positions(set: &CursorSet) -> Vec<Position> {
        set.iter().map(Cursor::position).collect()
    }

    // -- Single cursor movement --------------------------------------------

    #[test]
    fn up_keeps_column_when_valid() {
        // ["a","b"], (1,0) Up → (0,0).
        let b = buf(&["a", "b"]);
        let c = Cursor::at(p(1, 0)).moved(Direction::Up, &b);
        assert_eq!(c.position(), p(0, 0));
    }

    #[test]
    fn up_clamps_to_shorter_line() {
        let b = buf(&["a", "bcdef"]);
        let c = Cursor::at(p(1, 4)).moved(Direction::Up, &b);
        assert_eq!(c.position(), p(0, 1));
    }

    #[test]
    fn sticky_column_survives_short_line() {
        let b = buf(&["abcdef", "x", "abcdef"]);
        let c = Cursor::at(p(0, 5))
            .moved(Direction::Down, &b)
            .moved(Direction::Down, &b);
        assert_eq!(c.position(), p(2, 5));
    }

    #[test]
    fn horizontal_move_resets_sticky_column() {
        let b = buf(&["abcdef", "x", "abcdef"]);
        let c = Cursor::at(p(0, 5))
            .moved(Direction::Down, &b)
            .moved(Direction::Left, &b)
            .moved(Direction::Down, &b);
        assert_eq!(c.position(), p(2, 0));
    }

    #[test]
    fn left_wraps_to_previous_line_end() {
        let b = buf(&["abc", "d"]);
        assert_eq!(Cursor::at(p(1, 0)).moved(Direction::Left, &b).position(), p(0, 3));
        assert_eq!(Cursor::at(p(0, 0)).moved(Direction::Left, &b).position(), p(0, 0));
    }

    #[test]
    fn right_wraps_to_next_line_start() {
        let b = buf(&["abc", "d"]);
        assert_eq!(Cursor::at(p(0, 3)).moved(Direction::Right, &b).position(), p(1, 0));
        assert_eq!(Cursor::at(p(1, 1)).moved(Direction::Right, &b).position(), p(1, 1));
    }

    #[test]
    fn up_on_first_line_and_down_on_last_stay() {
        let b = buf(&["abc", "de"]);
        assert_eq!(Cursor::at(p(0, 2)).moved(Direction::Up, &b).position(), p(0, 2));
        assert_eq!(Cursor::at(p(1, 1)).moved(Direction::Down, &b).position(), p(1, 1));
    }

    #[test]
    fn line_and_buffer_jumps() {
        let b = buf(&["abc", "de"]);
        let c = Cursor::at(p(0, 1));
        assert_eq!(c.moved(Direction::LineEnd, &b).position(), p(0, 3));
        assert_eq!(c.moved(Direction::LineStart, &b).position(), p(0, 0));
        assert_eq!(c.moved(Direction::BufferEnd, &b).position(), p(1, 2));
        assert_eq!(
            Cursor::at(p(1, 1)).moved(Direction::BufferStart, &b).position(),
            Position::ZERO
        );
    }

    #[test]
    fn word_steps_reset_sticky_column() {
        let b = buf(&["let x = 1;", "y"]);
        let c = Cursor::at(p(0, 0)).moved(Direction::WordRight, &b);
        assert_eq!(c.position(), p(0, 4));
        assert_eq!(c.moved(Direction::Down, &b).position(), p(1, 1));
        assert_eq!(c.moved(Direction::WordLeft, &b).position(), p(0, 0));

        let sel = Cursor::at(p(0, 0)).extended(Direction::WordRight, &b).selection().unwrap();
        assert_eq!(sel.range(), Range::ordered(p(0, 0), p(0, 4)));
    }

    #[test]
    fn moved_lines_stops_at_edges() {
        let b = buf(&["a", "b", "c", "d"]);
        let c = Cursor::at(p(1, 0));
        assert_eq!(c.moved_lines(Vertical::Down, 10, &b).position(), p(3, 0));
        assert_eq!(c.moved_lines(Vertical::Up, 10, &b).position(), p(0, 0));
    }

    // -- Selection ----------------------------------------------------------

    #[test]
    fn extend_sets_anchor_once() {
        let b = buf(&["abcdef"]);
        let c = Cursor::at(p(0, 1))
            .extended(Direction::Right, &b)
            .extended(Direction::Right, &b);
        let sel = c.selection().unwrap();
        assert_eq!(sel.anchor, p(0, 1));
        assert_eq!(sel.active, p(0, 3));
        assert_eq!(sel.range(), Range::ordered(p(0, 1), p(0, 3)));
    }

    #[test]
    fn plain_move_drops_selection() {
        let b = buf(&["abcdef"]);
        let c = Cursor::at(p(0, 1)).extended(Direction::Right, &b);
        assert!(c.moved(Direction::Right, &b).selection().is_none());
    }

    #[test]
    fn empty_selection_is_none() {
        let mut c = Cursor::at(p(0, 2));
        c.set_anchor();
        assert!(c.selection().is_none());
    }

    // -- Clamp --------------------------------------------------------------

    #[test]
    fn clamp_in_bounds_is_identity() {
        let b = buf(&["abc"]);
        let mut c = Cursor::at(p(0, 2));
        let before = c;
        c.clamp(&b);
        assert_eq!(c, before);
    }

    #[test]
    fn clamp_pulls_cursor_and_anchor_in() {
        let b = buf(&["ab"]);
        let mut c = Cursor::at(p(5, 5));
        c.set_anchor();
        c.clamp(&b);
        assert_eq!(c.position(), p(0, 2));
        assert_eq!(c.anchor(), Some(p(0, 2)));
    }

    // -- CursorSet ----------------------------------------------------------

    #[test]
    fn set_starts_with_one_primary() {
        let set = CursorSet::default();
        assert_eq!(set.len(), 1);
        assert_eq!(set.primary().position(), Position::ZERO);
    }

    #[test]
    fn add_sorts_and_tracks_primary() {
        let mut set = CursorSet::new(Cursor::at(p(2, 0)));
        set.add(Cursor::at(p(0, 0)));
        assert_eq!(positions(&set), [p(0, 0), p(2, 0)]);
        assert_eq!(set.primary().position(), p(0, 0));
        assert_eq!(set.primary_index(), 0);
    }

    #[test]
    fn colliding_cursors_merge() {
        let b = buf(&["ab", "cd"]);
        let mut set = CursorSet::new(Cursor::at(p(0, 0)));
        set.add(Cursor::at(p(1, 0)));
        set.map(|c| c.moved(Direction::BufferStart, &b));
        assert_eq!(set.len(), 1);
        assert_eq!(set.primary().position(), Position::ZERO);
    }

    #[test]
    fn collapse_keeps_primary_only() {
        let mut set = CursorSet::new(Cursor::at(p(0, 0)));
        set.add(Cursor::at(p(1, 1)));
        set.collapse();
        assert_eq!(positions(&set), [p(1, 1)]);
    }

    #[test]
    fn shift_after_insert_skips_editor() {
        let mut set = CursorSet::new(Cursor::at(p(0, 1)));
        set.add(Cursor::at(p(0, 4)));
        // Cursor 0 typed "XY" at (0,1).
        set.shift_after_insert(0, p(0, 1), p(0, 3));
        assert_eq!(positions(&set), [p(0, 1), p(0, 6)]);
    }

    #[test]
    fn shift_after_delete_moves_anchor_too() {
        let mut set = CursorSet::new(Cursor::at(p(0, 0)));
        let mut other = Cursor::at(p(1, 3));
        other.set_anchor();
        set.add(other);
        // Cursor at index 0 joined line 1 into line 0 (length 4).
        set.shift_after_delete(0, Range::ordered(p(0, 4), p(1, 0)));
        let moved = set.get(1).unwrap();
        assert_eq!(moved.position(), p(0, 7));
        assert_eq!(moved.anchor(), Some(p(0, 7)));
    }

    #[test]
    fn set_clamp_merges_after_shrink() {
        let mut set = CursorSet::new(Cursor::at(p(0, 5)));
        set.add(Cursor::at(p(1, 5)));
        let small = buf(&["ab"]);
        set.clamp(&small);
        assert_eq!(positions(&set), [p(0, 2)]);
    }

    #[test]
    fn set_is_never_empty() {
        let b = buf(&["ab"]);
        let mut set = CursorSet::new(Cursor::at(p(0, 0)));
        assert!(!set.is_empty());
        set.add(Cursor::at(p(0, 0)));
        set.map(|c| c.moved(Direction::BufferEnd, &b));
        set.collapse();
        set.clamp(&buf(&[""]));
        assert!(!set.is_empty());
        assert_eq!(set.len(), 1);
    }
}
