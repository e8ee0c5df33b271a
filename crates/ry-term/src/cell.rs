// SPDX-License-Identifier: MIT
//
// Cell writes — the unit of screen output.
//
// The render pipeline never touches the terminal. It produces a `Frame`: a
// list of `CellWrite`s (row, column, text, attributes), an optional "clear
// first" flag for full redraws, and the screen position of the hardware
// cursor. The adapter turns that into escape sequences.
//
// A `CellWrite` is a run: consecutive cells on one row that share the same
// attributes. Wide characters (CJK, some emoji) advance the terminal cursor
// by two columns; the text carries the character once.

use unicode_width::UnicodeWidthStr;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR (Select Graphic Rendition) parameters:
    ///
    /// ```
    /// use ry_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::INVERSE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1 — increased intensity.
        const BOLD      = 1 << 0;
        /// SGR 2 — decreased intensity (faint).
        const DIM       = 1 << 1;
        /// SGR 4 — straight underline.
        const UNDERLINE = 1 << 2;
        /// SGR 7 — swap foreground and background.
        const INVERSE   = 1 << 3;
    }
}

// ─── CellWrite ───────────────────────────────────────────────────────────────

/// A run of text to place at `(row, col)` with uniform attributes.
///
/// Coordinates are 0-indexed screen cells. `text` never contains control
/// characters; the render pipeline expands tabs before emitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row: u16,
    pub col: u16,
    pub text: String,
    pub attr: Attr,
}

impl CellWrite {
    /// Create a run with no attributes.
    #[must_use]
    pub fn plain(row: u16, col: u16, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
            attr: Attr::empty(),
        }
    }

    /// Create a run with the given attributes.
    #[must_use]
    pub fn styled(row: u16, col: u16, text: impl Into<String>, attr: Attr) -> Self {
        Self {
            row,
            col,
            text: text.into(),
            attr,
        }
    }

    /// Number of screen columns this run covers.
    #[must_use]
    pub fn width(&self) -> usize {
        self.text.width()
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// Everything the terminal needs to show one rendered state.
///
/// `clear` requests a full-screen clear before the writes are applied: set
/// on the first frame, after a resize, and on explicit redraw. `cursor` is
/// the `(row, col)` of the hardware cursor, or `None` to hide it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub clear: bool,
    pub cells: Vec<CellWrite>,
    pub cursor: Option<(u16, u16)>,
}

impl Frame {
    /// True when applying this frame would not change the screen content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.clear && self.cells.is_empty()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
