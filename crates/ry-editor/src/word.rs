//! Word motions for Ctrl+Left and Ctrl+Right.
//!
//! A **word** is a run of word characters (letters, digits, underscore) or a
//! run of other non-blank characters (punctuation). `hello.world` is three
//! words. Blanks and line breaks separate words, and an empty line counts as
//! a word of its own, so both motions stop on it.
//!
//! The buffer has no stored terminators, so the walk treats the end of every
//! line but the last as one virtual `'\n'`. Past the last word the motions
//! run to the buffer edge: the end for [`word_forward`], the start for
//! [`word_backward`].

use crate::buffer::Buffer;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Character classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Punctuation,
    Blank,
    Newline,
}

fn classify(ch: char) -> CharClass {
    if ch == '\n' {
        CharClass::Newline
    } else if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() || ch == '_' {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

// ---------------------------------------------------------------------------
// Walking
// ---------------------------------------------------------------------------

/// The char at `pos`, `'\n'` at the end of a line that has a successor,
/// `None` at the end of the buffer.
fn char_at(buf: &Buffer, pos: Position) -> Option<char> {
    if pos.col < buf.line_len(pos.line) {
        buf.char_at(pos)
    } else if pos.line + 1 < buf.line_count() {
        Some('\n')
    } else {
        None
    }
}

fn class_at(buf: &Buffer, pos: Position) -> Option<CharClass> {
    char_at(buf, pos).map(classify)
}

fn next(buf: &Buffer, pos: Position) -> Option<Position> {
    if pos.col < buf.line_len(pos.line) {
        Some(Position::new(pos.line, pos.col + 1))
    } else if pos.line + 1 < buf.line_count() {
        Some(Position::new(pos.line + 1, 0))
    } else {
        None
    }
}

fn prev(buf: &Buffer, pos: Position) -> Option<Position> {
    if pos.col > 0 {
        Some(Position::new(pos.line, pos.col - 1))
    } else if pos.line > 0 {
        Some(Position::new(pos.line - 1, buf.line_len(pos.line - 1)))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Motions
// ---------------------------------------------------------------------------

/// Forward to the start of the next word.
///
/// 1. Skip the rest of the current word or punctuation run.
/// 2. Skip blanks and line breaks, stopping on an empty line.
#[must_use]
pub fn word_forward(buf: &Buffer, pos: Position) -> Position {
    let mut pos = buf.clamp_position(pos);
    let Some(start) = class_at(buf, pos) else {
        return pos;
    };

    if matches!(start, CharClass::Word | CharClass::Punctuation) {
        while class_at(buf, pos) == Some(start) {
            match next(buf, pos) {
                Some(p) => pos = p,
                None => return pos,
            }
        }
    }

    while let Some(class) = class_at(buf, pos) {
        match class {
            CharClass::Word | CharClass::Punctuation => break,
            CharClass::Blank => {}
            CharClass::Newline => {
                let Some(p) = next(buf, pos) else { break };
                if buf.line_len(p.line) == 0 {
                    return p;
                }
            }
        }
        match next(buf, pos) {
            Some(p) => pos = p,
            None => break,
        }
    }
    pos
}

/// Backward to the start of the previous word.
///
/// 1. Step back one char, then skip blanks and line breaks backward,
///    stopping on an empty line.
/// 2. Skip back to the first char of the word found.
#[must_use]
pub fn word_backward(buf: &Buffer, pos: Position) -> Position {
    let Some(mut pos) = prev(buf, buf.clamp_position(pos)) else {
        return Position::ZERO;
    };

    loop {
        match class_at(buf, pos) {
            Some(CharClass::Word | CharClass::Punctuation) => break,
            Some(CharClass::Newline) if buf.line_len(pos.line) == 0 => return pos,
            _ => match prev(buf, pos) {
                Some(p) => pos = p,
                None => return Position::ZERO,
            },
        }
    }

    let word = class_at(buf, pos);
    while let Some(p) = prev(buf, pos) {
        if p.line != pos.line || class_at(buf, p) != word {
            break;
        }
        pos = p;
    }
    pos
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

    /// Every stop `motion` makes from `from` until it stops moving.
    fn stops(b: &Buffer, from: Position, motion: fn(&Buffer, Position) -> Position) -> Vec<Position> {
        let mut out = Vec::new();
        let mut at = from;
        loop {
            let next = motion(b, at);
            if next == at {
                return out;
            }
            out.push(next);
            at = next;
        }
    }

    #[test]
    fn forward_over_words_and_punctuation() {
        let b = buf(&["hello.world  foo_bar"]);
        assert_eq!(stops(&b, p(0, 0), word_forward), [p(0, 5), p(0, 6), p(0, 13), p(0, 20)]);
    }

    #[test]
    fn backward_over_words_and_punctuation() {
        let b = buf(&["hello.world  foo_bar"]);
        assert_eq!(
            stops(&b, p(0, 20), word_backward),
            [p(0, 13), p(0, 6), p(0, 5), p(0, 0)]
        );
    }

    #[test]
    fn forward_crosses_line_breaks() {
        let b = buf(&["ab  ", "  cd"]);
        assert_eq!(word_forward(&b, p(0, 0)), p(1, 2));
    }

    #[test]
    fn backward_crosses_line_breaks() {
        let b = buf(&["ab", "  cd"]);
        assert_eq!(word_backward(&b, p(1, 2)), p(0, 0));
    }

    #[test]
    fn empty_line_is_a_stop_both_ways() {
        let b = buf(&["ab", "", "cd"]);
        assert_eq!(word_forward(&b, p(0, 0)), p(1, 0));
        assert_eq!(word_forward(&b, p(1, 0)), p(2, 0));
        assert_eq!(word_backward(&b, p(2, 0)), p(1, 0));
        assert_eq!(word_backward(&b, p(1, 0)), p(0, 0));
    }

    #[test]
    fn runs_to_buffer_edges() {
        let b = buf(&["  ab  "]);
        assert_eq!(word_forward(&b, p(0, 2)), p(0, 6));
        assert_eq!(word_backward(&b, p(0, 2)), p(0, 0));
        assert_eq!(word_forward(&b, p(0, 6)), p(0, 6));
        assert_eq!(word_backward(&b, p(0, 0)), p(0, 0));
    }

    #[test]
    fn unicode_letters_are_word_chars() {
        let b = buf(&["naïve café!"]);
        assert_eq!(stops(&b, p(0, 0), word_forward), [p(0, 6), p(0, 10), p(0, 11)]);
    }

    #[test]
    fn out_of_range_start_is_clamped() {
        let b = buf(&["ab cd"]);
        assert_eq!(word_backward(&b, p(9, 9)), p(0, 3));
    }
}
