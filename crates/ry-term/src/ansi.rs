// SPDX-License-Identifier: MIT
//
// Escape sequences, written to any `impl Write`.
//
// Three families: CSI positioning (`move_to`, `clear_screen`), SGR styling
// (`style`, `reset_style`), and DEC private modes (`set` / `unset`). The
// private modes cover cursor visibility, the alternate screen, bracketed
// paste, focus reports and synchronized output.
//
// Rows and columns are 0-based here and 1-based on the wire.

use std::io::{self, Write};

use crate::cell::Attr;

// ─── DEC private modes ──────────────────────────────────────────────────────

/// A mode switched with `CSI ? n h` (set) and `CSI ? n l` (unset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DecMode {
    /// Visible cursor (DECTCEM).
    Cursor = 25,
    /// `CSI I` / `CSI O` on focus gain and loss.
    FocusReports = 1004,
    /// Alternate screen. Unsetting it brings the shell's screen back.
    AltScreen = 1049,
    /// Pastes arrive wrapped in `CSI 200~` … `CSI 201~`.
    BracketedPaste = 2004,
    /// Output is held until unset. Terminals without it ignore it.
    SyncOutput = 2026,
}

impl DecMode {
    const fn code(self) -> u16 {
        self as u16
    }
}

#[inline]
pub fn set(w: &mut impl Write, mode: DecMode) -> io::Result<()> {
    write!(w, "\x1b[?{}h", mode.code())
}

#[inline]
pub fn unset(w: &mut impl Write, mode: DecMode) -> io::Result<()> {
    write!(w, "\x1b[?{}l", mode.code())
}

// ─── Positioning ────────────────────────────────────────────────────────────

/// CUP. Widened to `u32` so `u16::MAX` still gets its +1.
#[inline]
pub fn move_to(w: &mut impl Write, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(row) + 1, u32::from(col) + 1)
}

/// ED 2. Leaves the cursor where it was.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

// ─── Styling ────────────────────────────────────────────────────────────────

const SGR_CODES: [(Attr, u8); 4] = [
    (Attr::BOLD, 1),
    (Attr::DIM, 2),
    (Attr::UNDERLINE, 4),
    (Attr::INVERSE, 7),
];

/// SGR 0. Callers tracking attributes must forget them.
#[inline]
pub fn reset_style(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Turn on every flag in `attr` with one SGR sequence, codes ascending.
/// Writes nothing for an empty set. Flags already on stay on.
pub fn style(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    let mut codes = SGR_CODES.iter().filter(|(flag, _)| attr.contains(*flag));
    let Some((_, first)) = codes.next() else {
        return Ok(());
    };
    write!(w, "\x1b[{first}")?;
    for (_, code) in codes {
        write!(w, ";{code}")?;
    }
    w.write_all(b"m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emit(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn move_to_is_one_based() {
        assert_eq!(emit(|w| move_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(emit(|w| move_to(w, 2, 7)), "\x1b[3;8H");
        assert_eq!(emit(|w| move_to(w, u16::MAX, 0)), "\x1b[65536;1H");
    }

    #[test]
    fn private_modes() {
        let cases = [
            (DecMode::Cursor, "25"),
            (DecMode::FocusReports, "1004"),
            (DecMode::AltScreen, "1049"),
            (DecMode::BracketedPaste, "2004"),
            (DecMode::SyncOutput, "2026"),
        ];
        for (mode, code) in cases {
            assert_eq!(emit(|w| set(w, mode)), format!("\x1b[?{code}h"));
            assert_eq!(emit(|w| unset(w, mode)), format!("\x1b[?{code}l"));
        }
    }

    #[test]
    fn style_codes() {
        assert_eq!(emit(|w| style(w, Attr::empty())), "");
        assert_eq!(emit(|w| style(w, Attr::DIM)), "\x1b[2m");
        assert_eq!(emit(|w| style(w, Attr::INVERSE | Attr::BOLD)), "\x1b[1;7m");
        assert_eq!(emit(|w| style(w, Attr::all())), "\x1b[1;2;4;7m");
    }

    #[test]
    fn clear_and_reset() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
        assert_eq!(emit(|w| reset_style(w)), "\x1b[0m");
    }
}
