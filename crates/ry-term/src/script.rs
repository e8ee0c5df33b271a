// SPDX-License-Identifier: MIT
//
// A fake terminal for driving the editor without a TTY.
//
// `ScriptedTerminal` replays a fixed list of input events, keeps an
// in-memory screen that every cell write lands on, and counts raw-mode
// transitions. When the script runs out, `read_event` fails with
// `UnexpectedEof`, the same way the real adapter reports a closed stdin.

use std::collections::VecDeque;
use std::io;

use unicode_width::UnicodeWidthChar;

use crate::cell::{Attr, CellWrite};
use crate::input::InputEvent;
use crate::io::TerminalIo;
use crate::terminal::Size;

/// One screen cell of the fake terminal. A wide character occupies its
/// first cell; the cell after it holds `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    ch: Option<char>,
    attr: Attr,
}

const BLANK: Slot = Slot {
    ch: Some(' '),
    attr: Attr::empty(),
};

/// Scripted input, recorded output.
#[derive(Debug)]
pub struct ScriptedTerminal {
    script: VecDeque<InputEvent>,
    size: Size,
    screen: Vec<Vec<Slot>>,
    cursor: Option<(u16, u16)>,
    raw: bool,
    enters: usize,
    leaves: usize,
    clears: usize,
    flushes: usize,
    writes: Vec<CellWrite>,
}

impl ScriptedTerminal {
    /// A terminal of `size` that will deliver `events` in order.
    pub fn new(size: Size, events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            script: events.into_iter().collect(),
            size,
            screen: blank_screen(size),
            cursor: None,
            raw: false,
            enters: 0,
            leaves: 0,
            clears: 0,
            flushes: 0,
            writes: Vec::new(),
        }
    }

    /// Append more events to the end of the script.
    pub fn push(&mut self, event: InputEvent) {
        self.script.push_back(event);
    }

    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw
    }

    #[must_use]
    pub const fn enter_count(&self) -> usize {
        self.enters
    }

    #[must_use]
    pub const fn leave_count(&self) -> usize {
        self.leaves
    }

    #[must_use]
    pub const fn clear_count(&self) -> usize {
        self.clears
    }

    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Events not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Hardware cursor position after the last frame.
    #[must_use]
    pub const fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Every run written so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[CellWrite] {
        &self.writes
    }

    /// Forget the recorded runs (the screen keeps its content).
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Text on screen row `row`, trailing blanks trimmed.
    #[must_use]
    pub fn row_text(&self, row: u16) -> String {
        self.screen
            .get(usize::from(row))
            .map(|cells| cells.iter().filter_map(|s| s.ch).collect::<String>())
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }

    /// All rows, trailing blanks trimmed.
    #[must_use]
    pub fn screen_text(&self) -> Vec<String> {
        (0..self.size.rows).map(|r| self.row_text(r)).collect()
    }

    /// Attributes of the cell at `(row, col)`.
    #[must_use]
    pub fn attr_at(&self, row: u16, col: u16) -> Attr {
        self.screen
            .get(usize::from(row))
            .and_then(|cells| cells.get(usize::from(col)))
            .map_or(Attr::empty(), |s| s.attr)
    }

    fn put(&mut self, run: &CellWrite) {
        let Some(line) = self.screen.get_mut(usize::from(run.row)) else {
            return;
        };
        let mut col = usize::from(run.col);
        for ch in run.text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 || col + w > line.len() {
                break;
            }
            line[col] = Slot {
                ch: Some(ch),
                attr: run.attr,
            };
            if w == 2 {
                line[col + 1] = Slot {
                    ch: None,
                    attr: run.attr,
                };
            }
            col += w;
        }
    }
}

fn blank_screen(size: Size) -> Vec<Vec<Slot>> {
    vec![vec![BLANK; usize::from(size.cols)]; usize::from(size.rows)]
}

impl TerminalIo for ScriptedTerminal {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        self.enters += 1;
        self.raw = true;
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        self.leaves += 1;
        self.raw = false;
        Ok(())
    }

    fn read_event(&mut self) -> io::Result<InputEvent> {
        let event = self
            .script
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))?;

        if let InputEvent::Resize { rows, cols } = event {
            self.size = Size::new(rows, cols);
            self.screen = blank_screen(self.size);
        }
        Ok(event)
    }

    fn viewport_size(&self) -> Size {
        self.size
    }

    fn write_cells(&mut self, cells: &[CellWrite]) -> io::Result<()> {
        for run in cells {
            self.put(run);
            self.writes.push(run.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.clears += 1;
        self.screen = blank_screen(self.size);
        Ok(())
    }

    fn place_cursor(&mut self, at: Option<(u16, u16)>) -> io::Result<()> {
        self.cursor = at;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, SpecialKey};
    use pretty_assertions::assert_eq;

    #[test]
    fn replays_events_in_order_then_eof() {
        let mut term = ScriptedTerminal::new(
            Size::new(2, 4),
            [
                InputEvent::Character('a'),
                InputEvent::Special(SpecialKey::CtrlC, Modifiers::CTRL),
            ],
        );
        assert_eq!(term.read_event().unwrap(), InputEvent::Character('a'));
        assert_eq!(
            term.read_event().unwrap(),
            InputEvent::Special(SpecialKey::CtrlC, Modifiers::CTRL)
        );
        let err = term.read_event().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn resize_event_changes_viewport() {
        let mut term = ScriptedTerminal::new(Size::new(2, 4), [InputEvent::Resize { rows: 5, cols: 9 }]);
        term.read_event().unwrap();
        assert_eq!(term.viewport_size(), Size::new(5, 9));
        assert_eq!(term.screen_text().len(), 5);
    }

    #[test]
    fn writes_land_on_screen() {
        let mut term = ScriptedTerminal::new(Size::new(2, 6), []);
        term.write_cells(&[
            CellWrite::plain(0, 0, "ab"),
            CellWrite::styled(0, 3, "c", Attr::INVERSE),
        ])
        .unwrap();
        assert_eq!(term.row_text(0), "ab c");
        assert_eq!(term.attr_at(0, 3), Attr::INVERSE);
        assert_eq!(term.attr_at(0, 0), Attr::empty());
        assert_eq!(term.writes().len(), 2);
    }

    #[test]
    fn wide_chars_take_two_cells() {
        let mut term = ScriptedTerminal::new(Size::new(1, 6), []);
        term.write_cells(&[CellWrite::plain(0, 0, "中x")]).unwrap();
        assert_eq!(term.row_text(0), "中x");
    }

    #[test]
    fn text_past_right_edge_is_clipped() {
        let mut term = ScriptedTerminal::new(Size::new(1, 3), []);
        term.write_cells(&[CellWrite::plain(0, 1, "abcd")]).unwrap();
        assert_eq!(term.row_text(0), " ab");
    }

    #[test]
    fn clear_blanks_screen() {
        let mut term = ScriptedTerminal::new(Size::new(1, 3), []);
        term.write_cells(&[CellWrite::plain(0, 0, "abc")]).unwrap();
        term.clear().unwrap();
        assert_eq!(term.row_text(0), "");
        assert_eq!(term.clear_count(), 1);
    }
}
