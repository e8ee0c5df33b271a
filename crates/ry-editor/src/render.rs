//! Render pipeline — from buffer and cursors to the cell writes of a frame.
//!
//! The [`Renderer`] paints the whole visible state into a grid of cells,
//! compares it against the grid it painted last time, and emits only the
//! cells that differ, coalesced into runs of equal attributes. It never
//! talks to the terminal; the result is a [`Frame`] for the adapter.
//!
//! Layout:
//!
//! ```text
//! ┌──┬─────────────────────────┐
//! │ 1│fn main() {              │ ← rows - 1 text rows
//! │ 2│    let x = 1;           │
//! │  │~                        │ ← past end of buffer
//! ├──┴─────────────────────────┤
//! │ main.rs [+]          2:5   │ ← status line (inverse)
//! └────────────────────────────┘
//! ```
//!
//! Tabs expand to the next tab stop, wide characters take two columns, and
//! control characters show as `?`. Selections and secondary cursors are
//! drawn inverse; the primary cursor is the terminal's own cursor. Matches
//! of the highlighted search term are underlined.
//!
//! The first frame, the frame after a resize, and the frame after
//! [`invalidate`](Renderer::invalidate) are full redraws: the screen is
//! cleared and the grid is diffed against a blank one.

use unicode_width::UnicodeWidthChar;

use ry_term::{Attr, CellWrite, Frame, Size};

use crate::buffer::Buffer;
use crate::cursor::CursorSet;
use crate::position::{Position, Range};
use crate::search;
use crate::session::Status;

// ---------------------------------------------------------------------------
// Column math
// ---------------------------------------------------------------------------

/// Screen columns taken by `ch` when it starts at display column `at`.
fn char_width(ch: char, at: usize, tab_width: usize) -> usize {
    match ch {
        '\t' => {
            let tab = tab_width.max(1);
            (at / tab + 1) * tab - at
        }
        c if c.is_control() => 1,
        c => c.width().unwrap_or(0),
    }
}

/// The display column of char column `col` in `line`.
#[must_use]
pub fn display_col(line: &str, col: usize, tab_width: usize) -> usize {
    line.chars()
        .take(col)
        .fold(0, |at, ch| at + char_width(ch, at, tab_width))
}

/// Width of the line-number gutter, separator included. 0 when disabled.
#[must_use]
pub fn gutter_width(line_count: usize, line_numbers: bool) -> u16 {
    if !line_numbers {
        return 0;
    }
    let digits = line_count.max(1).ilog10() + 1;
    // At most 20 digits.
    #[allow(clippy::cast_possible_truncation)]
    let width = digits as u16 + 1;
    width
}

#[allow(clippy::cast_possible_truncation)]
fn to_u16(n: usize) -> u16 {
    n.min(usize::from(u16::MAX)) as u16
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// The visible window over the buffer plus the terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    top: usize,
    left: usize,
    size: Size,
}

impl Viewport {
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            top: 0,
            left: 0,
            size,
        }
    }

    /// First visible buffer line.
    #[must_use]
    pub const fn top_line(&self) -> usize {
        self.top
    }

    /// First visible display column.
    #[must_use]
    pub const fn left_col(&self) -> usize {
        self.left
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Rows available for text (the last row is the status line).
    #[must_use]
    pub const fn text_rows(&self) -> u16 {
        self.size.rows.saturating_sub(1)
    }

    pub const fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// Scroll by the minimum amount that puts `(line, col)` inside a text
    /// area of `rows` × `cols`. `col` is a display column.
    pub const fn scroll_into_view(&mut self, line: usize, col: usize, rows: usize, cols: usize) {
        if rows > 0 {
            if line < self.top {
                self.top = line;
            } else if line >= self.top + rows {
                self.top = line + 1 - rows;
            }
        }
        if cols > 0 {
            if col < self.left {
                self.left = col;
            } else if col >= self.left + cols {
                self.left = col + 1 - cols;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// One screen cell. `tail` marks the right half of a wide character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    attr: Attr,
    tail: bool,
}

impl Cell {
    const BLANK: Self = Self::new(' ', Attr::empty());

    const fn new(ch: char, attr: Attr) -> Self {
        Self {
            ch,
            attr,
            tail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Grid {
    size: Size,
    cells: Vec<Cell>,
}

impl Grid {
    fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::BLANK; usize::from(size.rows) * usize::from(size.cols)],
        }
    }

    fn row(&self, row: u16) -> &[Cell] {
        let cols = usize::from(self.size.cols);
        let start = usize::from(row) * cols;
        &self.cells[start..start + cols]
    }

    fn set(&mut self, row: u16, col: u16, cell: Cell) {
        if row < self.size.rows && col < self.size.cols {
            let i = usize::from(row) * usize::from(self.size.cols) + usize::from(col);
            self.cells[i] = cell;
        }
    }

    /// Put `ch` at `(row, col)`; returns the column after it. A wide char
    /// that would cross `end` becomes a blank.
    fn put(&mut self, row: u16, col: u16, end: u16, ch: char, attr: Attr) -> u16 {
        if col >= end {
            return col;
        }
        let w = ch.width().unwrap_or(0);
        if w == 2 {
            if col + 1 < end {
                self.set(row, col, Cell::new(ch, attr));
                self.set(
                    row,
                    col + 1,
                    Cell {
                        ch: ' ',
                        attr,
                        tail: true,
                    },
                );
                return col + 2;
            }
            self.set(row, col, Cell::new(' ', attr));
            return col + 1;
        }
        if w == 0 {
            return col;
        }
        self.set(row, col, Cell::new(ch, attr));
        col + 1
    }

    fn put_str(&mut self, row: u16, mut col: u16, end: u16, text: &str, attr: Attr) -> u16 {
        for ch in text.chars() {
            if col >= end {
                break;
            }
            col = self.put(row, col, end, ch, attr);
        }
        col
    }

    fn fill(&mut self, row: u16, from: u16, to: u16, cell: Cell) {
        for col in from..to {
            self.set(row, col, cell);
        }
    }
}

// ---------------------------------------------------------------------------
// Marks (selections, secondary cursors, search matches)
// ---------------------------------------------------------------------------

struct Marks<'a> {
    selections: Vec<Range>,
    secondary: Vec<Position>,
    highlight: Option<&'a str>,
}

impl<'a> Marks<'a> {
    fn collect(cursors: &CursorSet, highlight: Option<&'a str>) -> Self {
        let primary = cursors.primary_index();
        let mut selections = Vec::new();
        let mut secondary = Vec::new();
        for (i, c) in cursors.iter().enumerate() {
            if let Some(sel) = c.selection() {
                selections.push(sel.range());
            }
            if i != primary {
                secondary.push(c.position());
            }
        }
        Self {
            selections,
            secondary,
            highlight,
        }
    }

    /// Char spans of the highlighted term in `line`.
    fn hits_in(&self, line: &str) -> Vec<(usize, usize)> {
        self.highlight
            .map(|term| search::find_in_line(line, term))
            .unwrap_or_default()
    }

    fn attr_at(&self, pos: Position) -> Attr {
        if self.secondary.contains(&pos) || self.selections.iter().any(|r| r.contains(pos)) {
            Attr::INVERSE
        } else {
            Attr::empty()
        }
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// What to draw: borrowed editor state for one frame.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub buffer: &'a Buffer,
    pub cursors: &'a CursorSet,
    /// Shown at the left of the status line.
    pub name: &'a str,
    pub status: Option<&'a Status>,
    /// Search term whose matches are underlined.
    pub highlight: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Turns editor state into minimal frames. Keeps the viewport and the grid
/// of the last frame.
#[derive(Debug)]
pub struct Renderer {
    viewport: Viewport,
    previous: Option<Grid>,
    tab_width: usize,
    line_numbers: bool,
}

impl Renderer {
    /// A renderer whose first frame will be a full redraw.
    #[must_use]
    pub fn new(size: Size, tab_width: usize, line_numbers: bool) -> Self {
        Self {
            viewport: Viewport::new(size),
            previous: None,
            tab_width: tab_width.max(1),
            line_numbers,
        }
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Adopt a new terminal size; the next frame is a full redraw.
    pub fn resize(&mut self, size: Size) {
        tracing::debug!(rows = size.rows, cols = size.cols, "viewport resized");
        self.viewport.resize(size);
        self.previous = None;
    }

    /// Forget the last frame so the next one redraws everything.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    /// Render `view` for a terminal of `size`.
    pub fn render(&mut self, view: &View<'_>, size: Size) -> Frame {
        if size != self.viewport.size() {
            self.resize(size);
        }
        if size.rows == 0 || size.cols == 0 {
            self.previous = None;
            return Frame::default();
        }

        let buf = view.buffer;
        let primary = view.cursors.primary().position();
        let gutter = match gutter_width(buf.line_count(), self.line_numbers) {
            g if g < size.cols => g,
            _ => 0,
        };
        let text_cols = size.cols - gutter;
        let text_rows = self.viewport.text_rows();

        let cursor_dcol = display_col(buf.line(primary.line).unwrap_or(""), primary.col, self.tab_width);
        self.viewport.scroll_into_view(
            primary.line,
            cursor_dcol,
            usize::from(text_rows),
            usize::from(text_cols),
        );

        let mut grid = Grid::new(size);
        let marks = Marks::collect(view.cursors, view.highlight);
        for row in 0..text_rows {
            let line_idx = self.viewport.top_line() + usize::from(row);
            match buf.line(line_idx) {
                Some(line) => {
                    if gutter > 0 {
                        paint_line_number(&mut grid, row, gutter, line_idx + 1);
                    }
                    self.paint_text(&mut grid, row, gutter, line, line_idx, &marks);
                }
                None => {
                    grid.set(row, 0, Cell::new('~', Attr::DIM));
                }
            }
        }
        paint_status(&mut grid, text_rows, view);

        let cursor = self.cursor_cell(primary, cursor_dcol, gutter, text_rows);
        let clear = self.previous.is_none();
        let cells = diff(self.previous.as_ref(), &grid);
        tracing::trace!(clear, runs = cells.len(), "frame rendered");
        self.previous = Some(grid);

        Frame {
            clear,
            cells,
            cursor,
        }
    }

    fn cursor_cell(&self, pos: Position, dcol: usize, gutter: u16, text_rows: u16) -> Option<(u16, u16)> {
        let row = pos.line.checked_sub(self.viewport.top_line())?;
        let col = dcol.checked_sub(self.viewport.left_col())?;
        let col = usize::from(gutter) + col;
        (row < usize::from(text_rows) && col < usize::from(self.viewport.size().cols))
            .then(|| (to_u16(row), to_u16(col)))
    }

    fn paint_text(&self, grid: &mut Grid, row: u16, x0: u16, line: &str, line_idx: usize, marks: &Marks) {
        let left = self.viewport.left_col();
        let width = usize::from(grid.size.cols - x0);
        let end = grid.size.cols;
        let screen = |dc: usize| x0 + to_u16(dc - left);
        let visible = |dc: usize| dc >= left && dc < left + width;

        let hits = marks.hits_in(line);
        let underline = |i: usize| {
            if hits.iter().any(|&(start, end)| (start..end).contains(&i)) {
                Attr::UNDERLINE
            } else {
                Attr::empty()
            }
        };

        let mut dc = 0;
        let mut chars = 0;
        for (i, ch) in line.chars().enumerate() {
            chars = i + 1;
            let w = char_width(ch, dc, self.tab_width);
            if w == 0 {
                continue;
            }
            let attr = marks.attr_at(Position::new(line_idx, i)) | underline(i);
            if ch == '\t' || (w == 2 && !(visible(dc) && visible(dc + 1))) {
                // Tabs, and wide chars cut by an edge, paint as blanks.
                for k in (dc..dc + w).filter(|&k| visible(k)) {
                    grid.set(row, screen(k), Cell::new(' ', attr));
                }
            } else if visible(dc) {
                let glyph = if ch.is_control() { '?' } else { ch };
                grid.put(row, screen(dc), end, glyph, attr);
            }
            dc += w;
            if dc >= left + width {
                return;
            }
        }

        // A selected line break or a secondary cursor at the line end.
        let eol = marks.attr_at(Position::new(line_idx, chars));
        if !eol.is_empty() && visible(dc) {
            grid.set(row, screen(dc), Cell::new(' ', eol));
        }
    }
}

// ---------------------------------------------------------------------------
// Painting helpers
// ---------------------------------------------------------------------------

fn paint_line_number(grid: &mut Grid, row: u16, gutter: u16, number: usize) {
    let digits = number.to_string();
    let pad = usize::from(gutter - 1).saturating_sub(digits.len());
    let text = format!("{}{digits}", " ".repeat(pad));
    grid.put_str(row, 0, gutter - 1, &text, Attr::DIM);
}

fn paint_status(grid: &mut Grid, row: u16, view: &View<'_>) {
    let cols = grid.size.cols;
    grid.fill(row, 0, cols, Cell::new(' ', Attr::INVERSE));

    let pos = view.cursors.primary().position();
    let right = match view.cursors.len() {
        1 => format!(" {pos} "),
        n => format!(" {n} cursors  {pos} "),
    };
    let right_width = right.chars().map(|c| c.width().unwrap_or(0)).sum::<usize>();
    let right_start = cols.saturating_sub(to_u16(right_width));

    let modified = if view.buffer.is_modified() { " [+]" } else { "" };
    let left = format!(" {}{modified}", view.name);
    let mut col = grid.put_str(row, 0, right_start, &left, Attr::INVERSE);

    if let Some(status) = view.status {
        let attr = if status.is_error() {
            Attr::INVERSE | Attr::BOLD
        } else {
            Attr::INVERSE
        };
        col = grid.put_str(row, col, right_start, "  ", Attr::INVERSE);
        grid.put_str(row, col, right_start, status.text(), attr);
    }

    grid.put_str(row, right_start, cols, &right, Attr::INVERSE);
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Runs of cells in `current` that differ from `previous` (or from a blank
/// screen when there is no previous grid).
fn diff(previous: Option<&Grid>, current: &Grid) -> Vec<CellWrite> {
    let blank;
    let previous = match previous {
        Some(prev) if prev.size == current.size => prev,
        _ => {
            blank = Grid::new(current.size);
            &blank
        }
    };

    let mut runs = Vec::new();
    for row in 0..current.size.rows {
        let now = current.row(row);
        let before = previous.row(row);
        // Row-level skip: one slice comparison.
        if now == before {
            continue;
        }

        let mut run: Option<CellWrite> = None;
        for (col, (cell, old)) in now.iter().zip(before).enumerate() {
            if cell == old {
                runs.extend(run.take());
                continue;
            }
            if cell.tail {
                continue;
            }
            match &mut run {
                Some(r) if r.attr == cell.attr => r.text.push(cell.ch),
                _ => {
                    runs.extend(run.take());
                    run = Some(CellWrite::styled(row, to_u16(col), cell.ch.to_string(), cell.attr));
                }
            }
        }
        runs.extend(run);
    }
    runs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
