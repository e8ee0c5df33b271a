//! Undo/redo history — transaction-based edit tracking.
//!
//! Every buffer mutation is recorded as a reversible [`Edit`], and the edits
//! of one command are grouped into a [`Transaction`]. A command that types at
//! five cursors is one transaction and undoes in one step.
//!
//! ```text
//! history.begin(&cursors);
//! // edit the buffer, recording each change:
//! history.record_delete(range, &removed);
//! history.record_insert(range, text);
//! history.commit(&cursors);
//! ```
//!
//! Transactions carry the whole cursor set from before and after the
//! command, so undo puts every cursor back where it was and redo puts them
//! where the command left them.
//!
//! Transactions with no edits are dropped. A new transaction clears the redo
//! stack; there is no branching history. The undo stack keeps at most
//! `limit` transactions, forgetting the oldest.

use std::collections::VecDeque;

use crate::buffer::Buffer;
use crate::cursor::CursorSet;
use crate::error::EditError;
use crate::position::Range;

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

/// One reversible change. `range` is where the text sits in the buffer
/// while it is present: right after an insert, right before a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Insert { range: Range, text: String },
    Delete { range: Range, text: String },
}

impl Edit {
    fn apply(&self, buf: &mut Buffer) -> Result<(), EditError> {
        match self {
            Self::Insert { range, text } => buf.insert(range.start, text).map(drop),
            Self::Delete { range, .. } => buf.delete(*range).map(drop),
        }
    }

    fn revert(&self, buf: &mut Buffer) -> Result<(), EditError> {
        match self {
            Self::Insert { range, .. } => buf.delete(*range).map(drop),
            Self::Delete { range, text } => buf.insert(range.start, text).map(drop),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Transaction {
    edits: Vec<Edit>,
    cursors_before: CursorSet,
    cursors_after: CursorSet,
}

impl Transaction {
    fn undo(&self, buf: &mut Buffer) -> Result<(), EditError> {
        self.edits.iter().rev().try_for_each(|edit| edit.revert(buf))
    }

    fn redo(&self, buf: &mut Buffer) -> Result<(), EditError> {
        self.edits.iter().try_for_each(|edit| edit.apply(buf))
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo and redo stacks for one buffer.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Transaction>,
    redo_stack: Vec<Transaction>,
    pending: Option<Transaction>,
    limit: usize,
}

impl History {
    pub const DEFAULT_LIMIT: usize = 1000;

    /// An empty history keeping up to `limit` undo steps (at least one).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            pending: None,
            limit: limit.max(1),
        }
    }

    /// Start a transaction. `cursors` is the state to return to on undo.
    /// A transaction still pending is committed first.
    pub fn begin(&mut self, cursors: &CursorSet) {
        if self.pending.is_some() {
            self.commit(cursors);
        }
        self.pending = Some(Transaction {
            edits: Vec::new(),
            cursors_before: cursors.clone(),
            cursors_after: cursors.clone(),
        });
    }

    /// `text` now occupies `range`. Ignored outside a transaction.
    pub fn record_insert(&mut self, range: Range, text: &str) {
        if range.is_empty() {
            return;
        }
        if let Some(txn) = &mut self.pending {
            txn.edits.push(Edit::Insert {
                range,
                text: text.to_owned(),
            });
        }
    }

    /// `text` was removed from `range`. Ignored outside a transaction.
    pub fn record_delete(&mut self, range: Range, text: &str) {
        if range.is_empty() {
            return;
        }
        if let Some(txn) = &mut self.pending {
            txn.edits.push(Edit::Delete {
                range,
                text: text.to_owned(),
            });
        }
    }

    /// Finish the transaction. `cursors` is the state redo returns to.
    pub fn commit(&mut self, cursors: &CursorSet) {
        let Some(mut txn) = self.pending.take() else {
            return;
        };
        if txn.edits.is_empty() {
            return;
        }
        txn.cursors_after = cursors.clone();
        self.redo_stack.clear();
        self.undo_stack.push_back(txn);
        if self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Revert the last transaction and return the cursors from before it,
    /// or `None` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// [`EditError`] if a recorded position no longer fits the buffer,
    /// meaning the buffer was changed behind the history's back.
    pub fn undo(&mut self, buf: &mut Buffer) -> Result<Option<CursorSet>, EditError> {
        if let Some(cursors) = self.pending.as_ref().map(|t| t.cursors_after.clone()) {
            self.commit(&cursors);
        }

        let Some(txn) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        txn.undo(buf)?;
        let cursors = txn.cursors_before.clone();
        self.redo_stack.push(txn);
        Ok(Some(cursors))
    }

    /// Re-apply the last undone transaction and return the cursors from
    /// after it, or `None` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// As for [`undo`](Self::undo).
    pub fn redo(&mut self, buf: &mut Buffer) -> Result<Option<CursorSet>, EditError> {
        let Some(txn) = self.redo_stack.pop() else {
            return Ok(None);
        };
        txn.redo(buf)?;
        let cursors = txn.cursors_after.clone();
        self.undo_stack.push_back(txn);
        Ok(Some(cursors))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.pending.as_ref().is_some_and(|t| !t.edits.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget everything, e.g. when another file is loaded.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::position::Position;
    use pretty_assertions::assert_eq;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn at(pos: Position) -> CursorSet {
        CursorSet::new(Cursor::at(pos))
    }

    fn text(buf: &Buffer) -> String {
        buf.lines().collect::<Vec<_>>().join("\n")
    }

    /// Insert `s` at `pos` as its own transaction, the way the session does.
    fn typed(h: &mut History, buf: &mut Buffer, pos: Position, s: &str) {
        h.begin(&at(pos));
        let end = buf.insert(pos, s).unwrap();
        h.record_insert(Range::ordered(pos, end), s);
        h.commit(&at(end));
    }

    /// Delete `range` as its own transaction.
    fn deleted(h: &mut History, buf: &mut Buffer, range: Range) {
        h.begin(&at(range.end));
        let removed = buf.delete(range).unwrap();
        h.record_delete(range, &removed);
        h.commit(&at(range.start));
    }

    // -- Basic undo/redo ----------------------------------------------------

    #[test]
    fn undo_single_insert() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        typed(&mut h, &mut buf, Position::ZERO, "hello");
        assert_eq!(text(&buf), "hello");

        let cursors = h.undo(&mut buf).unwrap().unwrap();
        assert_eq!(text(&buf), "");
        assert_eq!(cursors.primary().position(), Position::ZERO);
    }

    #[test]
    fn undo_single_delete() {
        let mut buf = Buffer::from_text("hello");
        let mut h = History::default();
        deleted(&mut h, &mut buf, Range::ordered(p(0, 4), p(0, 5)));
        assert_eq!(text(&buf), "hell");

        let cursors = h.undo(&mut buf).unwrap().unwrap();
        assert_eq!(text(&buf), "hello");
        assert_eq!(cursors.primary().position(), p(0, 5));
    }

    #[test]
    fn redo_after_undo() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        typed(&mut h, &mut buf, Position::ZERO, "hello");

        h.undo(&mut buf).unwrap();
        let cursors = h.redo(&mut buf).unwrap().unwrap();
        assert_eq!(text(&buf), "hello");
        assert_eq!(cursors.primary().position(), p(0, 5));
    }

    #[test]
    fn undo_and_redo_with_nothing_recorded() {
        let mut buf = Buffer::from_text("x");
        let mut h = History::default();
        assert_eq!(h.undo(&mut buf).unwrap(), None);
        assert_eq!(h.redo(&mut buf).unwrap(), None);
        assert_eq!(text(&buf), "x");
    }

    // -- Stacks -------------------------------------------------------------

    #[test]
    fn transactions_undo_in_reverse_order() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        typed(&mut h, &mut buf, p(0, 0), "a");
        typed(&mut h, &mut buf, p(0, 1), "b");
        typed(&mut h, &mut buf, p(0, 2), "c");

        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "ab");
        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "a");
        h.redo(&mut buf).unwrap();
        assert_eq!(text(&buf), "ab");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        typed(&mut h, &mut buf, p(0, 0), "a");
        h.undo(&mut buf).unwrap();
        assert!(h.can_redo());

        typed(&mut h, &mut buf, p(0, 0), "b");
        assert!(!h.can_redo());
        assert_eq!(h.redo(&mut buf).unwrap(), None);
        assert_eq!(text(&buf), "b");
    }

    #[test]
    fn empty_transaction_is_dropped() {
        let mut h = History::default();
        h.begin(&at(Position::ZERO));
        h.record_insert(Range::point(Position::ZERO), "");
        h.commit(&at(Position::ZERO));
        assert!(!h.can_undo());
        assert_eq!(h.undo_count(), 0);
    }

    #[test]
    fn limit_forgets_oldest() {
        let mut buf = Buffer::from_text("");
        let mut h = History::new(2);
        for (i, s) in ["a", "b", "c"].into_iter().enumerate() {
            typed(&mut h, &mut buf, p(0, i), s);
        }
        assert_eq!(h.undo_count(), 2);
        h.undo(&mut buf).unwrap();
        h.undo(&mut buf).unwrap();
        assert_eq!(h.undo(&mut buf).unwrap(), None);
        assert_eq!(text(&buf), "a");
    }

    #[test]
    fn undo_commits_a_pending_transaction() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        h.begin(&at(Position::ZERO));
        let end = buf.insert(Position::ZERO, "xy").unwrap();
        h.record_insert(Range::ordered(Position::ZERO, end), "xy");
        assert!(h.can_undo());

        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "");
        assert_eq!(h.redo_count(), 1);
    }

    // -- Multi-edit transactions --------------------------------------------

    #[test]
    fn replace_undoes_as_one_step() {
        let mut buf = Buffer::from_text("hello world");
        let mut h = History::default();
        let range = Range::ordered(p(0, 0), p(0, 5));

        h.begin(&at(range.end));
        let removed = buf.delete(range).unwrap();
        h.record_delete(range, &removed);
        let end = buf.insert(range.start, "bye").unwrap();
        h.record_insert(Range::ordered(range.start, end), "bye");
        h.commit(&at(end));
        assert_eq!(text(&buf), "bye world");

        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "hello world");
        h.redo(&mut buf).unwrap();
        assert_eq!(text(&buf), "bye world");
    }

    #[test]
    fn multiline_insert_and_delete() {
        let mut buf = Buffer::from_text("ab\ncd");
        let mut h = History::default();
        typed(&mut h, &mut buf, p(0, 1), "1\n2\n3");
        assert_eq!(text(&buf), "a1\n2\n3b\ncd");
        deleted(&mut h, &mut buf, Range::ordered(p(0, 0), p(3, 1)));
        assert_eq!(text(&buf), "d");

        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "a1\n2\n3b\ncd");
        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "ab\ncd");
    }

    #[test]
    fn crlf_text_round_trips() {
        let mut buf = Buffer::from_text("ab");
        let mut h = History::default();
        typed(&mut h, &mut buf, p(0, 1), "x\r\ny");
        assert_eq!(buf.line_count(), 2);

        h.undo(&mut buf).unwrap();
        assert_eq!(text(&buf), "ab");
        h.redo(&mut buf).unwrap();
        assert_eq!(text(&buf), "ax\nyb");
    }

    #[test]
    fn clear_forgets_everything() {
        let mut buf = Buffer::from_text("");
        let mut h = History::default();
        typed(&mut h, &mut buf, Position::ZERO, "a");
        h.clear();
        assert!(!h.can_undo());
        assert_eq!(h.undo(&mut buf).unwrap(), None);
    }
}
