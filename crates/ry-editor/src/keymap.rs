//! Key bindings — chord strings and the table that maps them to commands.
//!
//! A [`KeyChord`] is one key plus modifiers, normalized from an
//! [`InputEvent`]. The [`Keymap`] maps chords to [`Command`]s. It starts from
//! the built-in table and accepts overrides from the `[keys]` configuration
//! section:
//!
//! ```toml
//! [keys]
//! "ctrl-s" = "save"
//! "alt-down" = "add-cursor-down"
//! "f5" = "redraw"
//! "ctrl-q" = "noop"   # unbind
//! ```
//!
//! # Chord syntax
//!
//! Modifiers `ctrl-`, `alt-`, `shift-` in any order, then a key: a single
//! character, `f1`..`f20`, or one of `up down left right home end pageup
//! pagedown enter tab backtab backspace delete insert escape`. Case does not
//! matter for names; a single character key keeps its case.
//!
//! `ctrl-h`, `ctrl-i`, `ctrl-j` and `ctrl-m` are rejected. The terminal sends
//! the same bytes for Backspace, Tab and Enter, so such a binding could never
//! fire; bind `backspace`, `tab` or `enter` instead.

use std::collections::HashMap;
use std::fmt;

use ry_term::{InputEvent, Modifiers, SpecialKey};

use crate::command::Command;
use crate::cursor::{Direction, Vertical};

// ---------------------------------------------------------------------------
// KeymapError
// ---------------------------------------------------------------------------

/// A `[keys]` entry that could not be applied. Reported, then skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeymapError {
    #[error("invalid key chord {0:?}")]
    InvalidChord(String),
    #[error("unknown command {name:?} for {chord:?}")]
    UnknownCommand { chord: String, name: String },
}

// ---------------------------------------------------------------------------
// KeyChord
// ---------------------------------------------------------------------------

/// One key with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: SpecialKey,
    pub mods: Modifiers,
}

impl KeyChord {
    #[must_use]
    pub const fn new(key: SpecialKey, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    #[must_use]
    pub const fn plain(key: SpecialKey) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// The chord an input event represents, if it is a key press.
    #[must_use]
    pub const fn from_event(event: &InputEvent) -> Option<Self> {
        match *event {
            InputEvent::Character(c) => Some(Self::plain(SpecialKey::Char(c))),
            InputEvent::Special(key, mods) => Some(Self::new(key, mods)),
            _ => None,
        }
    }

    /// Parse a chord string such as `ctrl-s` or `shift-left`.
    ///
    /// # Errors
    ///
    /// [`KeymapError::InvalidChord`] if the modifiers or key name are not
    /// recognized.
    pub fn parse(s: &str) -> Result<Self, KeymapError> {
        let invalid = || KeymapError::InvalidChord(s.to_string());

        let mut mods = Modifiers::empty();
        let mut rest = s.trim();
        loop {
            let lower = rest.to_ascii_lowercase();
            let (flag, len) = if lower.starts_with("ctrl-") {
                (Modifiers::CTRL, 5)
            } else if lower.starts_with("alt-") {
                (Modifiers::ALT, 4)
            } else if lower.starts_with("shift-") {
                (Modifiers::SHIFT, 6)
            } else {
                break;
            };
            mods |= flag;
            rest = &rest[len..];
        }

        let key = parse_key(rest).ok_or_else(invalid)?;
        let key = match key {
            // Control letters arrive as their own key.
            SpecialKey::Char(c) if mods.contains(Modifiers::CTRL) => {
                let c = c.to_ascii_lowercase();
                if !c.is_ascii_lowercase() || SHADOWED_CTRL.contains(&c) {
                    return Err(invalid());
                }
                if c == 'c' { SpecialKey::CtrlC } else { SpecialKey::Ctrl(c) }
            }
            other => other,
        };
        Ok(Self::new(key, mods))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.contains(Modifiers::CTRL) {
            f.write_str("ctrl-")?;
        }
        if self.mods.contains(Modifiers::ALT) {
            f.write_str("alt-")?;
        }
        if self.mods.contains(Modifiers::SHIFT) {
            f.write_str("shift-")?;
        }
        match self.key {
            SpecialKey::Char(c) | SpecialKey::Ctrl(c) => write!(f, "{c}"),
            SpecialKey::CtrlC => f.write_str("c"),
            SpecialKey::F(n) => write!(f, "f{n}"),
            other => f.write_str(key_name(other)),
        }
    }
}

/// Control letters that decode as Backspace, Tab or Enter.
const SHADOWED_CTRL: [char; 4] = ['h', 'i', 'j', 'm'];

const NAMED_KEYS: &[(&str, SpecialKey)] = &[
    ("up", SpecialKey::Up),
    ("down", SpecialKey::Down),
    ("left", SpecialKey::Left),
    ("right", SpecialKey::Right),
    ("home", SpecialKey::Home),
    ("end", SpecialKey::End),
    ("pageup", SpecialKey::PageUp),
    ("pagedown", SpecialKey::PageDown),
    ("enter", SpecialKey::Enter),
    ("tab", SpecialKey::Tab),
    ("backtab", SpecialKey::BackTab),
    ("backspace", SpecialKey::Backspace),
    ("delete", SpecialKey::Delete),
    ("insert", SpecialKey::Insert),
    ("escape", SpecialKey::Escape),
    ("esc", SpecialKey::Escape),
    ("del", SpecialKey::Delete),
];

fn parse_key(s: &str) -> Option<SpecialKey> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(SpecialKey::Char(c));
    }

    let lower = s.to_ascii_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        return (1..=20).contains(&n).then_some(SpecialKey::F(n));
    }
    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|&(_, key)| key)
}

fn key_name(key: SpecialKey) -> &'static str {
    NAMED_KEYS
        .iter()
        .find(|(_, k)| *k == key)
        .map_or("?", |(name, _)| name)
}

// ---------------------------------------------------------------------------
// Command names
// ---------------------------------------------------------------------------

const DIRECTIONS: &[(&str, Direction)] = &[
    ("up", Direction::Up),
    ("down", Direction::Down),
    ("left", Direction::Left),
    ("right", Direction::Right),
    ("line-start", Direction::LineStart),
    ("line-end", Direction::LineEnd),
    ("word-left", Direction::WordLeft),
    ("word-right", Direction::WordRight),
    ("buffer-start", Direction::BufferStart),
    ("buffer-end", Direction::BufferEnd),
];

/// The command a `[keys]` value names, e.g. `save`, `move-up`,
/// `select-line-end`, `add-cursor-down`.
#[must_use]
pub fn command_by_name(name: &str) -> Option<Command> {
    let name = name.trim().to_ascii_lowercase();
    let direction = |suffix: &str| {
        DIRECTIONS
            .iter()
            .find(|(n, _)| *n == suffix)
            .map(|&(_, d)| d)
    };

    if let Some(d) = name.strip_prefix("move-").and_then(direction) {
        return Some(Command::MoveCursor(d));
    }
    if let Some(d) = name.strip_prefix("select-").and_then(direction) {
        return Some(Command::ExtendSelection(d));
    }

    Some(match name.as_str() {
        "save" => Command::Save,
        "quit" => Command::Quit,
        "redraw" => Command::Redraw,
        "noop" => Command::Noop,
        "newline" => Command::InsertNewline,
        "tab" => Command::InsertChar('\t'),
        "delete-backward" => Command::DeleteBackward,
        "delete-forward" => Command::DeleteForward,
        "page-up" => Command::ScrollPage(Vertical::Up),
        "page-down" => Command::ScrollPage(Vertical::Down),
        "add-cursor-up" => Command::AddCursor(Vertical::Up),
        "add-cursor-down" => Command::AddCursor(Vertical::Down),
        "collapse-cursors" => Command::CollapseCursors,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "copy-line" => Command::CopyLine,
        "cut-line" => Command::CutLine,
        "paste-lines" => Command::PasteLines,
        "search" => Command::StartSearch,
        "search-next" => Command::SearchNext,
        "search-prev" => Command::SearchPrev,
        "clear-search" => Command::ClearSearch,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

/// Chord → command table.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    bindings: HashMap<KeyChord, Command>,
}

impl Keymap {
    /// A keymap with no bindings at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `chord`, replacing any earlier binding.
    pub fn bind(&mut self, chord: KeyChord, command: Command) {
        self.bindings.insert(chord, command);
    }

    #[must_use]
    pub fn lookup(&self, chord: &KeyChord) -> Option<&Command> {
        self.bindings.get(chord)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Apply `(chord, command name)` overrides. Bad entries are collected
    /// and returned; the good ones still take effect.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Vec<KeymapError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut errors = Vec::new();
        for (chord_str, name) in overrides {
            let chord = match KeyChord::parse(chord_str) {
                Ok(chord) => chord,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            match command_by_name(name) {
                Some(command) => {
                    tracing::debug!(%chord, ?command, "key override");
                    self.bind(chord, command);
                }
                None => errors.push(KeymapError::UnknownCommand {
                    chord: chord_str.to_string(),
                    name: name.to_string(),
                }),
            }
        }
        errors
    }
}

impl Default for Keymap {
    /// The built-in bindings.
    fn default() -> Self {
        use SpecialKey as K;

        let none = Modifiers::empty();
        let shift = Modifiers::SHIFT;
        let ctrl = Modifiers::CTRL;

        let mut map = Self::empty();
        let mut bind = |key, mods, command| map.bind(KeyChord::new(key, mods), command);

        for (key, dir) in [
            (K::Up, Direction::Up),
            (K::Down, Direction::Down),
            (K::Left, Direction::Left),
            (K::Right, Direction::Right),
            (K::Home, Direction::LineStart),
            (K::End, Direction::LineEnd),
        ] {
            bind(key, none, Command::MoveCursor(dir));
            bind(key, shift, Command::ExtendSelection(dir));
        }
        bind(K::Left, ctrl, Command::MoveCursor(Direction::WordLeft));
        bind(K::Right, ctrl, Command::MoveCursor(Direction::WordRight));
        bind(K::Left, ctrl | shift, Command::ExtendSelection(Direction::WordLeft));
        bind(K::Right, ctrl | shift, Command::ExtendSelection(Direction::WordRight));
        bind(K::Home, ctrl, Command::MoveCursor(Direction::BufferStart));
        bind(K::End, ctrl, Command::MoveCursor(Direction::BufferEnd));
        bind(K::Home, ctrl | shift, Command::ExtendSelection(Direction::BufferStart));
        bind(K::End, ctrl | shift, Command::ExtendSelection(Direction::BufferEnd));

        bind(K::Up, Modifiers::ALT, Command::AddCursor(Vertical::Up));
        bind(K::Down, Modifiers::ALT, Command::AddCursor(Vertical::Down));
        bind(K::PageUp, none, Command::ScrollPage(Vertical::Up));
        bind(K::PageDown, none, Command::ScrollPage(Vertical::Down));

        bind(K::Enter, none, Command::InsertNewline);
        bind(K::Tab, none, Command::InsertChar('\t'));
        bind(K::Backspace, none, Command::DeleteBackward);
        bind(K::Delete, none, Command::DeleteForward);

        bind(K::Ctrl('s'), ctrl, Command::Save);
        bind(K::Ctrl('l'), ctrl, Command::Redraw);
        bind(K::Ctrl('g'), ctrl, Command::CollapseCursors);
        bind(K::Ctrl('z'), ctrl, Command::Undo);
        bind(K::Ctrl('y'), ctrl, Command::Redo);
        bind(K::Ctrl('k'), ctrl, Command::CutLine);
        bind(K::Char('6'), Modifiers::ALT, Command::CopyLine);
        bind(K::Ctrl('u'), ctrl, Command::PasteLines);
        bind(K::Ctrl('f'), ctrl, Command::StartSearch);
        bind(K::Ctrl('n'), ctrl, Command::SearchNext);
        bind(K::Ctrl('p'), ctrl, Command::SearchPrev);
        bind(K::F(3), none, Command::SearchNext);
        bind(K::Ctrl('q'), ctrl, Command::Quit);
        bind(K::CtrlC, ctrl, Command::Quit);
        bind(K::Escape, none, Command::Quit);

        map
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
