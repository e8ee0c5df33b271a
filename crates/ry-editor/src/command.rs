//! Command interpreter — from input events to editing commands.
//!
//! [`Interpreter::apply`] is a pure transition function: given the current
//! [`Mode`], one [`InputEvent`], and read-only views of the buffer and the
//! primary cursor, it returns the [`Command`] to run and the next mode. It
//! never mutates anything; the session applies the command.
//!
//! In [`Mode::Insert`] keys go through the [`Keymap`]. Printable characters
//! that are not bound insert themselves. Everything else is an explicit
//! [`Command::Noop`], logged at debug level so dropped input is always
//! visible in the log.
//!
//! [`Mode::Search`] is the one-line search prompt. Its keys are fixed:
//! printable characters and pastes edit the query, Backspace erases, Enter
//! submits, and Escape, Ctrl-C or Ctrl-G cancel. The keymap is not consulted.

use std::fmt;

use ry_term::{InputEvent, SpecialKey};

use crate::buffer::Buffer;
use crate::cursor::{Cursor, Direction, Vertical};
use crate::keymap::{KeyChord, Keymap};
use crate::render::display_col;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One editing action, applied immediately and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InsertChar(char),
    /// Paste, soft tabs.
    InsertText(String),
    InsertNewline,
    /// Backspace. Nothing happens at the start of the buffer.
    DeleteBackward,
    /// Delete. Nothing happens at the end of the buffer.
    DeleteForward,
    MoveCursor(Direction),
    ExtendSelection(Direction),
    ScrollPage(Vertical),
    AddCursor(Vertical),
    /// Back to the primary cursor alone. Also hides search highlights.
    CollapseCursors,
    Undo,
    Redo,
    /// Copy the lines under the cursors to the line register.
    CopyLine,
    /// Copy, then delete, the lines under the cursors.
    CutLine,
    /// Insert the line register below each cursor's line.
    PasteLines,
    /// Open the search prompt.
    StartSearch,
    /// Text typed or pasted into the prompt.
    PromptInput(String),
    PromptBackspace,
    /// Search for the prompt's query (or the last term if it is empty).
    SubmitSearch,
    CancelPrompt,
    SearchNext,
    SearchPrev,
    ClearSearch,
    Save,
    Quit,
    Redraw,
    Resize { rows: u16, cols: u16 },
    Noop,
}

impl Command {
    /// True for commands that change buffer content.
    #[must_use]
    pub const fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::InsertChar(_)
                | Self::InsertText(_)
                | Self::InsertNewline
                | Self::DeleteBackward
                | Self::DeleteForward
                | Self::Undo
                | Self::Redo
                | Self::CutLine
                | Self::PasteLines
        )
    }

    /// The mode after this command, starting from `mode`.
    #[must_use]
    pub const fn next_mode(&self, mode: Mode) -> Mode {
        match self {
            Self::StartSearch => Mode::Search,
            Self::SubmitSearch | Self::CancelPrompt => Mode::Insert,
            _ => mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How input is interpreted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Keys type text unless bound to something else.
    #[default]
    Insert,
    /// Keys edit the search prompt.
    Search,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Search => f.write_str("SEARCH"),
        }
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Maps input to commands through a keymap.
#[derive(Debug, Clone)]
pub struct Interpreter {
    keymap: Keymap,
    tab_width: usize,
    tabs_to_spaces: bool,
}

impl Interpreter {
    #[must_use]
    pub fn new(keymap: Keymap, tab_width: usize, tabs_to_spaces: bool) -> Self {
        Self {
            keymap,
            tab_width: tab_width.max(1),
            tabs_to_spaces,
        }
    }

    #[must_use]
    pub const fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub const fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }

    pub const fn set_tabs_to_spaces(&mut self, on: bool) {
        self.tabs_to_spaces = on;
    }

    /// Interpret one event. `cursor` is the primary cursor; it decides how
    /// many spaces a soft tab needs.
    #[must_use]
    pub fn apply(&self, mode: Mode, event: &InputEvent, buf: &Buffer, cursor: &Cursor) -> (Command, Mode) {
        let command = match event {
            InputEvent::Resize { rows, cols } => Command::Resize {
                rows: *rows,
                cols: *cols,
            },
            InputEvent::Paste(text) if text.is_empty() => Command::Noop,
            InputEvent::Focus(_) | InputEvent::Unknown(_) => Command::Noop,
            _ if mode == Mode::Search => prompt_key(event),
            InputEvent::Paste(text) => Command::InsertText(text.clone()),
            InputEvent::Character(_) | InputEvent::Special(..) => self.key(event, buf, cursor),
        };

        if command == Command::Noop {
            tracing::debug!(?event, %mode, "unbound input ignored");
        } else {
            tracing::debug!(?event, ?command, "interpreted");
        }
        let next = command.next_mode(mode);
        (command, next)
    }

    fn key(&self, event: &InputEvent, buf: &Buffer, cursor: &Cursor) -> Command {
        let Some(chord) = KeyChord::from_event(event) else {
            return Command::Noop;
        };
        match self.keymap.lookup(&chord) {
            Some(Command::InsertChar('\t')) if self.tabs_to_spaces => self.soft_tab(buf, cursor),
            Some(command) => command.clone(),
            None => match *event {
                InputEvent::Character(c) if !c.is_control() => Command::InsertChar(c),
                _ => Command::Noop,
            },
        }
    }

    /// Spaces from the cursor to the next tab stop.
    fn soft_tab(&self, buf: &Buffer, cursor: &Cursor) -> Command {
        let pos = cursor.position();
        let line = buf.line(pos.line).unwrap_or("");
        let at = display_col(line, pos.col, self.tab_width);
        let n = self.tab_width - at % self.tab_width;
        Command::InsertText(" ".repeat(n))
    }
}

/// Keys while the search prompt is open. The query is a single line, so a
/// multi-line paste keeps its first line.
fn prompt_key(event: &InputEvent) -> Command {
    match event {
        InputEvent::Character(c) if !c.is_control() => Command::PromptInput(c.to_string()),
        InputEvent::Paste(text) => match text.lines().next() {
            Some(line) if !line.is_empty() => Command::PromptInput(line.to_owned()),
            _ => Command::Noop,
        },
        InputEvent::Special(key, _) => match key {
            SpecialKey::Backspace => Command::PromptBackspace,
            SpecialKey::Enter => Command::SubmitSearch,
            SpecialKey::Escape | SpecialKey::CtrlC | SpecialKey::Ctrl('g') => Command::CancelPrompt,
            _ => Command::Noop,
        },
        _ => Command::Noop,
    }
}

impl Default for Interpreter {
    /// Default keymap, 4-column hard tabs.
    fn default() -> Self {
        Self::new(Keymap::default(), 4, false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
