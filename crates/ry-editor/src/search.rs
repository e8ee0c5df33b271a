//! Literal search over buffer lines.
//!
//! A term is matched as plain text, case-sensitive, inside single lines.
//! Matches on a line do not overlap and are found left to right. Columns are
//! char offsets like everywhere else.
//!
//! [`find_next`] and [`find_prev`] wrap around the buffer. A wrapped result
//! says so, which the session reports in the status line.

use crate::buffer::Buffer;
use crate::position::{Position, Range};

/// Where a search landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub range: Range,
    /// The search went past one end of the buffer to find it.
    pub wrapped: bool,
}

/// Char column spans `(start, end)` of every match of `term` in `line`.
#[must_use]
pub fn find_in_line(line: &str, term: &str) -> Vec<(usize, usize)> {
    if term.is_empty() {
        return Vec::new();
    }
    let len = term.chars().count();
    let mut spans = Vec::new();
    // Byte offsets come back ascending; count chars incrementally.
    let (mut byte, mut col) = (0, 0);
    for (at, _) in line.match_indices(term) {
        col += line[byte..at].chars().count();
        byte = at;
        spans.push((col, col + len));
    }
    spans
}

fn span_range(line: usize, (start, end): (usize, usize)) -> Range {
    Range {
        start: Position::new(line, start),
        end: Position::new(line, end),
    }
}

/// The first match starting after `from`, wrapping to the top. A match at
/// `from` itself is found only after going all the way around.
#[must_use]
pub fn find_next(buf: &Buffer, from: Position, term: &str) -> Option<Match> {
    let count = buf.line_count();
    let from = buf.clamp_position(from);

    for step in 0..=count {
        let line = (from.line + step) % count;
        let wrapped = from.line + step >= count;
        let Some(text) = buf.line(line) else { continue };
        let hit = find_in_line(text, term).into_iter().find(|&(start, _)| match step {
            0 => start > from.col,
            s if s == count => start <= from.col,
            _ => true,
        });
        if let Some(span) = hit {
            return Some(Match {
                range: span_range(line, span),
                wrapped,
            });
        }
    }
    None
}

/// The last match starting before `from`, wrapping to the bottom. A match
/// at `from` itself is found only after going all the way around.
#[must_use]
pub fn find_prev(buf: &Buffer, from: Position, term: &str) -> Option<Match> {
    let count = buf.line_count();
    let from = buf.clamp_position(from);

    for step in 0..=count {
        let line = (from.line + count * 2 - step) % count;
        let wrapped = step > from.line;
        let Some(text) = buf.line(line) else { continue };
        let hit = find_in_line(text, term).into_iter().rev().find(|&(start, _)| match step {
            0 => start < from.col,
            s if s == count => start >= from.col,
            _ => true,
        });
        if let Some(span) = hit {
            return Some(Match {
                range: span_range(line, span),
                wrapped,
            });
        }
    }
    None
}

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

    fn start(m: Option<Match>) -> Option<(Position, bool)> {
        m.map(|m| (m.range.start, m.wrapped))
    }

    #[test]
    fn line_matches_are_char_columns() {
        assert_eq!(find_in_line("a foo b foo", "foo"), [(2, 5), (8, 11)]);
        assert_eq!(find_in_line("é foo", "foo"), [(2, 5)]);
        assert_eq!(find_in_line("aaaa", "aa"), [(0, 2), (2, 4)]);
        assert!(find_in_line("abc", "").is_empty());
        assert!(find_in_line("abc", "x").is_empty());
    }

    #[test]
    fn next_moves_forward_then_wraps() {
        let b = buf(&["foo x", "y foo", "foo"]);
        assert_eq!(start(find_next(&b, p(0, 0), "foo")), Some((p(1, 2), false)));
        assert_eq!(start(find_next(&b, p(1, 2), "foo")), Some((p(2, 0), false)));
        assert_eq!(start(find_next(&b, p(2, 0), "foo")), Some((p(0, 0), true)));
    }

    #[test]
    fn prev_moves_backward_then_wraps() {
        let b = buf(&["foo x", "y foo", "foo"]);
        assert_eq!(start(find_prev(&b, p(2, 0), "foo")), Some((p(1, 2), false)));
        assert_eq!(start(find_prev(&b, p(1, 2), "foo")), Some((p(0, 0), false)));
        assert_eq!(start(find_prev(&b, p(0, 0), "foo")), Some((p(2, 0), true)));
    }

    #[test]
    fn same_line_matches_are_ordered() {
        let b = buf(&["ab ab ab"]);
        assert_eq!(start(find_next(&b, p(0, 3), "ab")), Some((p(0, 6), false)));
        assert_eq!(start(find_prev(&b, p(0, 3), "ab")), Some((p(0, 0), false)));
    }

    #[test]
    fn only_match_under_cursor_is_found_after_wrapping() {
        let b = buf(&["x foo", "bar"]);
        assert_eq!(start(find_next(&b, p(0, 2), "foo")), Some((p(0, 2), true)));
        assert_eq!(start(find_prev(&b, p(0, 2), "foo")), Some((p(0, 2), true)));
    }

    #[test]
    fn match_range_spans_the_term() {
        let b = buf(&["say héllo"]);
        let m = find_next(&b, Position::ZERO, "héllo").unwrap();
        assert_eq!(m.range, Range::ordered(p(0, 4), p(0, 9)));
    }

    #[test]
    fn missing_term_is_none() {
        let b = buf(&["abc", "def"]);
        assert_eq!(find_next(&b, Position::ZERO, "zzz"), None);
        assert_eq!(find_prev(&b, Position::ZERO, "zzz"), None);
        assert_eq!(find_next(&b, Position::ZERO, ""), None);
    }
}
