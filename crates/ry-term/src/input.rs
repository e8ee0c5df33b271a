// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw stdin bytes into `InputEvent`s. Handles the protocols the
// adapter enables in `tty.rs`:
//
// - Legacy CSI sequences (arrows, editing keys, function keys) with xterm
//   modifier parameters (`CSI 1;5A` is Ctrl+Up)
// - SS3 sequences (arrows and F1-F4 in application mode)
// - Bracketed paste (accumulates pasted text between delimiters)
// - Focus reporting (terminal gained / lost focus)
// - Alt+key (ESC followed by a printable character)
// - UTF-8 multi-byte characters
//
// Bytes the decoder does not understand are never dropped silently: they
// come out as `InputEvent::Unknown` so the editor can log them.
//
// # Design
//
// The parser keeps a small byte buffer because escape sequences can span
// multiple `read()` calls. Feed bytes with [`Parser::advance`] and collect
// the returned events. After a timeout with no new bytes, call
// [`Parser::flush`] to emit a pending lone ESC as the Escape key.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// One normalized user input action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A printable character with no modifiers beyond Shift.
    Character(char),
    /// A named key, possibly with modifiers.
    Special(SpecialKey, Modifiers),
    /// Bracketed paste content, delivered as one event.
    Paste(String),
    /// The terminal changed size.
    Resize { rows: u16, cols: u16 },
    /// The terminal gained (`true`) or lost (`false`) focus.
    Focus(bool),
    /// Bytes the decoder could not interpret.
    Unknown(Vec<u8>),
}

/// Identity of a non-printable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Tab,
    /// Shift+Tab (`CSI Z`).
    BackTab,
    Backspace,
    Delete,
    Insert,
    Escape,
    /// Ctrl+C, kept apart from the other control letters because it
    /// always means "interrupt".
    CtrlC,
    /// Ctrl plus a lowercase letter (or `@` for NUL).
    Ctrl(char),
    /// A printable key that arrived with Alt held.
    Char(char),
    /// F1 through F20.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Uses the xterm CSI modifier bitmask, where the wire parameter is
    /// `1 + bitmask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// Bracketed paste start delimiter: `CSI 200~`.
const PASTE_START: &[u8] = b"\x1b[200~";
/// Bracketed paste end delimiter: `CSI 201~`.
const PASTE_END: &[u8] = b"\x1b[201~";

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Stateful input decoder.
///
/// A lone `ESC` is ambiguous: the Escape key, or the first byte of a
/// sequence still in flight. It stays pending until more bytes settle it
/// or the caller's timeout calls [`flush`](Parser::flush).
pub struct Parser {
    buf: Vec<u8>,
    /// Between the paste delimiters.
    in_paste: bool,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            in_paste: false,
        }
    }

    /// Feed raw bytes and return every event that can be decoded.
    ///
    /// Incomplete sequences stay buffered and combine with the bytes of
    /// later calls.
    pub fn advance(&mut self, data: &[u8]) -> Vec<InputEvent> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut used = 0;
        while used < self.buf.len() {
            let Some((event, n)) = step(&mut self.in_paste, &self.buf[used..]) else {
                break;
            };
            events.extend(event);
            used += n;
        }
        self.buf.drain(..used);
        events
    }

    /// Bytes are held back waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Inside a bracketed paste, waiting for the closing delimiter.
    #[must_use]
    pub const fn in_paste(&self) -> bool {
        self.in_paste
    }

    /// Resolve whatever is still pending after the ESC timeout.
    ///
    /// A leading ESC becomes the Escape key. Anything after it is decoded
    /// again from scratch; bytes that still do not form an event (a
    /// truncated UTF-8 character, an unterminated CSI) come out as
    /// `Unknown`.
    pub fn flush(&mut self) -> Vec<InputEvent> {
        if self.in_paste {
            // The closing delimiter never came; deliver what we have.
            self.in_paste = false;
            let text = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return vec![InputEvent::Paste(text)];
        }

        let pending = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        let mut rest: &[u8] = &pending;

        while !rest.is_empty() {
            if rest[0] == 0x1B {
                events.push(special(SpecialKey::Escape));
                rest = &rest[1..];
                continue;
            }
            match try_parse(rest) {
                Parsed::Event(event, n) => {
                    events.push(event);
                    rest = &rest[n..];
                }
                Parsed::Unknown(n) => {
                    events.push(InputEvent::Unknown(rest[..n].to_vec()));
                    rest = &rest[n..];
                }
                Parsed::Incomplete => {
                    events.push(InputEvent::Unknown(rest.to_vec()));
                    rest = &[];
                }
            }
        }

        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoding step at the front of `rest`: an event (or `None` for a
/// paste opener) and the bytes it used. `None` overall means wait.
fn step(in_paste: &mut bool, rest: &[u8]) -> Option<(Option<InputEvent>, usize)> {
    if *in_paste {
        let end = find_subsequence(rest, PASTE_END)?;
        *in_paste = false;
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        return Some((Some(InputEvent::Paste(text)), end + PASTE_END.len()));
    }
    if rest.starts_with(PASTE_START) {
        *in_paste = true;
        return Some((None, PASTE_START.len()));
    }
    // `ESC [ 2 0` split across reads may still open a paste.
    if rest.len() > 2 && rest.len() < PASTE_START.len() && PASTE_START.starts_with(rest) {
        return None;
    }
    match try_parse(rest) {
        Parsed::Event(event, n) => Some((Some(event), n)),
        Parsed::Unknown(n) => Some((Some(InputEvent::Unknown(rest[..n].to_vec())), n)),
        Parsed::Incomplete => None,
    }
}

// ─── Stateless Parsing Functions ────────────────────────────────────────────
//
// Every parse function reads from the front of `buf` and returns what it
// found plus how many bytes to consume.

/// Result of trying to parse one event from the front of the buffer.
enum Parsed {
    /// Decoded an event, consuming `usize` bytes.
    Event(InputEvent, usize),
    /// The sequence is incomplete; wait for more bytes.
    Incomplete,
    /// The first `usize` bytes form nothing we understand.
    Unknown(usize),
}

fn try_parse(buf: &[u8]) -> Parsed {
    let Some(&first) = buf.first() else {
        return Parsed::Incomplete;
    };

    match first {
        0x1B => parse_escape(buf),
        0x03 => Parsed::Event(special_with(SpecialKey::CtrlC, Modifiers::CTRL), 1),
        0x08 | 0x7F => Parsed::Event(special(SpecialKey::Backspace), 1),
        0x09 => Parsed::Event(special(SpecialKey::Tab), 1),
        0x0A | 0x0D => Parsed::Event(special(SpecialKey::Enter), 1),
        0x00 => Parsed::Event(ctrl_letter('@'), 1),
        b @ 0x01..=0x1A => Parsed::Event(ctrl_letter(char::from(b + b'a' - 1)), 1),
        b @ 0x20..=0x7E => Parsed::Event(InputEvent::Character(char::from(b)), 1),
        0xC0..=0xFF => parse_utf8(buf),
        // File separator and friends, bare continuation bytes.
        _ => Parsed::Unknown(1),
    }
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    debug_assert_eq!(buf[0], 0x1B);

    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1B => Parsed::Event(special_with(SpecialKey::Escape, Modifiers::ALT), 2),
        b @ 0x20..=0x7E => Parsed::Event(
            special_with(SpecialKey::Char(char::from(b)), Modifiers::ALT),
            2,
        ),
        b @ 0x01..=0x1A => Parsed::Event(
            special_with(
                SpecialKey::Ctrl(char::from(b + b'a' - 1)),
                Modifiers::ALT | Modifiers::CTRL,
            ),
            2,
        ),
        // ESC followed by something unrelated: the ESC stands alone.
        _ => Parsed::Event(special(SpecialKey::Escape), 1),
    }
}

// ── CSI (Control Sequence Introducer) ───────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'[');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    match buf[2] {
        b'I' => return Parsed::Event(InputEvent::Focus(true), 3),
        b'O' => return Parsed::Event(InputEvent::Focus(false), 3),
        _ => {}
    }

    // Scan for the final byte (0x40..=0x7E). Parameter bytes are in
    // 0x30..=0x3F, intermediates in 0x20..=0x2F.
    let mut end = 2;
    while end < buf.len() {
        let b = buf[end];
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Unknown(end);
        }
        end += 1;
    }

    if end >= buf.len() {
        return Parsed::Incomplete;
    }

    let final_byte = buf[end];
    let params = parse_csi_params(&buf[2..end]);
    let consumed = end + 1;

    // ── Tilde-terminated sequences (editing keys, function keys) ─────
    if final_byte == b'~' {
        let first = params.first().copied().unwrap_or(0);
        let modifiers = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));

        let key = match first {
            1 | 7 => SpecialKey::Home,
            2 => SpecialKey::Insert,
            3 => SpecialKey::Delete,
            4 | 8 => SpecialKey::End,
            5 => SpecialKey::PageUp,
            6 => SpecialKey::PageDown,
            n @ 11..=15 => SpecialKey::F(fn_key_number(n - 10)),
            n @ 17..=21 => SpecialKey::F(fn_key_number(n - 11)),
            n @ 23..=26 => SpecialKey::F(fn_key_number(n - 12)),
            n @ 28..=29 => SpecialKey::F(fn_key_number(n - 13)),
            n @ 31..=34 => SpecialKey::F(fn_key_number(n - 14)),
            _ => return Parsed::Unknown(consumed),
        };
        return Parsed::Event(special_with(key, modifiers), consumed);
    }

    // ── Letter-terminated sequences ─────────────────────────────────
    let modifiers = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));

    let key = match final_byte {
        b'A' => SpecialKey::Up,
        b'B' => SpecialKey::Down,
        b'C' => SpecialKey::Right,
        b'D' => SpecialKey::Left,
        b'H' => SpecialKey::Home,
        b'F' => SpecialKey::End,
        b'P' => SpecialKey::F(1),
        b'Q' => SpecialKey::F(2),
        b'R' => SpecialKey::F(3),
        b'S' => SpecialKey::F(4),
        b'Z' => return Parsed::Event(special_with(SpecialKey::BackTab, Modifiers::SHIFT), consumed),
        _ => return Parsed::Unknown(consumed),
    };

    Parsed::Event(special_with(key, modifiers), consumed)
}

// ── SS3 (Single Shift 3) ───────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'O');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    let key = match buf[2] {
        b'A' => SpecialKey::Up,
        b'B' => SpecialKey::Down,
        b'C' => SpecialKey::Right,
        b'D' => SpecialKey::Left,
        b'H' => SpecialKey::Home,
        b'F' => SpecialKey::End,
        b'P' => SpecialKey::F(1),
        b'Q' => SpecialKey::F(2),
        b'R' => SpecialKey::F(3),
        b'S' => SpecialKey::F(4),
        _ => return Parsed::Unknown(3),
    };

    Parsed::Event(special(key), 3)
}

// ── UTF-8 ──────────────────────────────────────────────────────────────────

fn parse_utf8(buf: &[u8]) -> Parsed {
    let expected = utf8_char_len(buf[0]);

    if expected == 0 {
        return Parsed::Unknown(1);
    }
    if buf.len() < expected {
        return Parsed::Incomplete;
    }

    std::str::from_utf8(&buf[..expected])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Parsed::Unknown(1), |ch| {
            Parsed::Event(InputEvent::Character(ch), expected)
        })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

const fn special(key: SpecialKey) -> InputEvent {
    InputEvent::Special(key, Modifiers::empty())
}

const fn special_with(key: SpecialKey, modifiers: Modifiers) -> InputEvent {
    InputEvent::Special(key, modifiers)
}

const fn ctrl_letter(c: char) -> InputEvent {
    InputEvent::Special(SpecialKey::Ctrl(c), Modifiers::CTRL)
}

/// Parse semicolon-separated CSI parameters. Colon sub-parameters are
/// ignored; missing values read as 0.
///
/// - `1;2` → `[1, 2]`
/// - (empty) → `[]`
fn parse_csi_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

/// Decode the xterm modifier parameter (`1 + bitmask`) into flags.
/// A parameter of 0 or 1 means no modifiers.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    let val = if param > 0 { param - 1 } else { 0 };
    Modifiers::from_bits_truncate(val as u8)
}

/// Function key numbers are small; the match arms above bound them.
#[allow(clippy::cast_possible_truncation)]
const fn fn_key_number(n: u16) -> u8 {
    n as u8
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
