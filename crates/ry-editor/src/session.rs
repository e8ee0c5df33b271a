//! Session — one editor, one buffer, one loop.
//!
//! A [`Session`] owns everything the editor knows: the buffer and its undo
//! history, the cursors, the interpreter and its mode, the renderer, the
//! file path and store, the line register, the search state, and the status
//! message. There is no global state; the loop borrows the session mutably
//! and nothing else does.
//!
//! Every command that edits goes through one `edit_each` call, which records
//! one undo transaction covering all cursors.
//!
//! # The loop
//!
//! [`run`](Session::run) enters raw mode through a [`RawModeGuard`], then
//! repeats: render a frame, block for one event, interpret it, apply the
//! command. Applying a command updates buffer and cursors together before
//! the next render can look at them. `Quit` leaves the loop before another
//! frame is drawn.
//!
//! Two kinds of failure end the loop, both through the guard so raw mode is
//! left exactly once: terminal I/O errors and invariant violations
//! ([`EditError`]). File errors never do; they become a status message.

use std::path::{Path, PathBuf};

use ry_term::{Frame, InputEvent, RawModeGuard, Size, TerminalIo};

use crate::buffer::{Buffer, LineEnding};
use crate::command::{Command, Interpreter, Mode};
use crate::config::Config;
use crate::cursor::{Cursor, CursorSet, Vertical};
use crate::error::{EditError, FileError, SaveError, SessionError};
use crate::files::FileStore;
use crate::history::History;
use crate::position::{Position, Range};
use crate::render::{Renderer, View};
use crate::search;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// A message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    kind: StatusKind,
    text: String,
}

impl Status {
    #[must_use]
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StatusKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SearchState {
    /// The last submitted term.
    term: Option<String>,
    /// Matches of `term` are underlined.
    highlight: bool,
    /// The query being typed while the prompt is open.
    query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seek {
    Next,
    Prev,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The editor state.
#[derive(Debug)]
pub struct Session<S: FileStore> {
    buffer: Buffer,
    history: History,
    cursors: CursorSet,
    mode: Mode,
    interpreter: Interpreter,
    renderer: Renderer,
    path: Option<PathBuf>,
    status: Option<Status>,
    store: S,
    new_file_ending: LineEnding,
    /// Whole lines from the last copy or cut, joined by `\n`.
    register: Option<String>,
    search: SearchState,
}

impl<S: FileStore> Session<S> {
    /// An empty, unnamed buffer configured by `config`. Bad `[keys]`
    /// entries are logged and reported in the status line.
    #[must_use]
    pub fn new(store: S, config: &Config) -> Self {
        let editor = &config.editor;
        let (keymap, errors) = config.keymap();
        for err in &errors {
            tracing::warn!(%err, "ignoring key binding");
        }

        let mut session = Self {
            buffer: Buffer::with_line_ending(editor.line_ending),
            history: History::new(editor.undo_limit),
            cursors: CursorSet::default(),
            mode: Mode::default(),
            interpreter: Interpreter::new(keymap, editor.tab_width, editor.tabs_to_spaces),
            renderer: Renderer::new(Size::DEFAULT, editor.tab_width, editor.line_numbers),
            path: None,
            status: None,
            store,
            new_file_ending: editor.line_ending,
            register: None,
            search: SearchState::default(),
        };
        if let Some(first) = errors.first() {
            let more = match errors.len() {
                1 => String::new(),
                n => format!(" (+{} more)", n - 1),
            };
            session.set_status(StatusKind::Warning, format!("config: {first}{more}"));
        }
        session
    }

    // -- Accessors ----------------------------------------------------------

    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[must_use]
    pub const fn cursors(&self) -> &CursorSet {
        &self.cursors
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Contents of the line register.
    #[must_use]
    pub fn register(&self) -> Option<&str> {
        self.register.as_deref()
    }

    /// The last submitted search term.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.term.as_deref()
    }

    pub const fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(Status::new(kind, text));
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Name shown in the status line.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .map_or_else(|| "[No Name]".to_string(), |p| p.display().to_string())
    }

    // -- Startup ------------------------------------------------------------

    /// Load `path` into the buffer. Never fails: a missing file starts an
    /// empty buffer bound to the path, other errors leave an empty buffer
    /// and an error status, and invalid UTF-8 loads lossily with a warning.
    pub fn open(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.cursors = CursorSet::default();
        self.history.clear();
        self.mode = Mode::default();
        self.search.query = None;
        self.renderer.invalidate();

        match self.store.read_file(&path) {
            Ok(bytes) => {
                let (buffer, decode) = Buffer::load(&bytes);
                self.buffer = buffer;
                tracing::info!(path = %path.display(), lines = self.buffer.line_count(), "opened");
                match decode {
                    Some(err) => self.set_status(StatusKind::Warning, err.to_string()),
                    None => self.set_status(
                        StatusKind::Info,
                        format!("{} lines, {}", self.buffer.line_count(), self.buffer.line_ending()),
                    ),
                }
            }
            Err(FileError::NotFound(_)) => {
                self.buffer = Buffer::with_line_ending(self.new_file_ending);
                tracing::info!(path = %path.display(), "new file");
                self.set_status(StatusKind::Info, "new file");
            }
            Err(err) => {
                tracing::warn!(%err, "open failed");
                self.buffer = Buffer::with_line_ending(self.new_file_ending);
                self.set_status(StatusKind::Error, err.to_string());
            }
        }
        self.path = Some(path);
    }

    /// Run the startup customization hook once, before the loop.
    pub fn customize(&mut self, hook: impl FnOnce(&mut Self)) {
        hook(self);
    }

    // -- Loop ---------------------------------------------------------------

    /// Drive the editor until Quit.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminal`] if the terminal fails (including a closed
    /// input), [`SessionError::Invariant`] if an edit hits an out-of-bounds
    /// position. Raw mode has been left in both cases.
    pub fn run<T: TerminalIo + ?Sized>(&mut self, term: &mut T) -> Result<(), SessionError> {
        let mut guard = RawModeGuard::acquire(term)?;
        tracing::info!("session started");

        loop {
            let frame = self.render(guard.viewport_size());
            guard.draw(&frame)?;

            let event = guard.read_event()?;
            if self.handle_event(&event)? == Flow::Quit {
                break;
            }
        }

        tracing::info!(modified = self.buffer.is_modified(), "session ended");
        guard.release()?;
        Ok(())
    }

    /// Interpret and apply one event.
    ///
    /// # Errors
    ///
    /// [`EditError`] when an edit violates buffer bounds.
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<Flow, EditError> {
        let (command, mode) = self
            .interpreter
            .apply(self.mode, event, &self.buffer, self.cursors.primary());
        self.mode = mode;
        self.execute(command)
    }

    /// The frame that brings the terminal up to date.
    pub fn render(&mut self, size: Size) -> Frame {
        let name = self.display_name();
        let view = View {
            buffer: &self.buffer,
            cursors: &self.cursors,
            name: &name,
            status: self.status.as_ref(),
            highlight: self.search.term.as_deref().filter(|_| self.search.highlight),
        };
        self.renderer.render(&view, size)
    }

    // -- Commands -----------------------------------------------------------

    /// Apply one command. Buffer and cursors are consistent again when this
    /// returns.
    ///
    /// # Errors
    ///
    /// [`EditError`] when an edit violates buffer bounds.
    pub fn execute(&mut self, command: Command) -> Result<Flow, EditError> {
        if command.is_edit() && self.status.as_ref().is_some_and(|s| !s.is_error()) {
            self.clear_status();
        }
        self.mode = command.next_mode(self.mode);

        let buf = &self.buffer;
        match command {
            Command::InsertChar(c) => self.insert(c.encode_utf8(&mut [0; 4]))?,
            Command::InsertText(text) => self.insert(&text)?,
            Command::InsertNewline => self.insert("\n")?,
            Command::DeleteBackward => self.delete(backward_range)?,
            Command::DeleteForward => self.delete(forward_range)?,
            Command::MoveCursor(dir) => self.cursors.map(|c| c.moved(dir, buf)),
            Command::ExtendSelection(dir) => self.cursors.map(|c| c.extended(dir, buf)),
            Command::ScrollPage(dir) => {
                let page = usize::from(self.renderer.viewport().text_rows().max(1));
                self.cursors.map(|c| c.moved_lines(dir, page, buf));
            }
            Command::AddCursor(dir) => self.add_cursor(dir),
            Command::CollapseCursors => {
                self.cursors.collapse();
                self.search.highlight = false;
            }
            Command::Undo => self.undo()?,
            Command::Redo => self.redo()?,
            Command::CopyLine => {
                let n = self.copy_lines();
                self.set_status(StatusKind::Info, format!("copied {}", plural(n, "line")));
            }
            Command::CutLine => self.cut_lines()?,
            Command::PasteLines => self.paste_lines()?,
            Command::StartSearch => self.edit_query(String::clear),
            Command::PromptInput(text) => self.edit_query(|q| q.push_str(&text)),
            Command::PromptBackspace => self.edit_query(|q| {
                q.pop();
            }),
            Command::SubmitSearch => self.submit_search(),
            Command::CancelPrompt => {
                self.search.query = None;
                self.clear_status();
            }
            Command::SearchNext => self.seek(Seek::Next),
            Command::SearchPrev => self.seek(Seek::Prev),
            Command::ClearSearch => self.search.highlight = false,
            Command::Save => self.save(),
            Command::Quit => return Ok(Flow::Quit),
            Command::Redraw => self.renderer.invalidate(),
            Command::Resize { rows, cols } => self.renderer.resize(Size::new(rows, cols)),
            Command::Noop => {}
        }
        Ok(Flow::Continue)
    }

    fn add_cursor(&mut self, dir: Vertical) {
        let from = *self.cursors.primary();
        let to = from.moved_lines(dir, 1, &self.buffer);
        if to.line() == from.line() {
            let edge = match dir {
                Vertical::Up => "no line above",
                Vertical::Down => "no line below",
            };
            self.set_status(StatusKind::Info, edge);
            return;
        }
        self.cursors.add(to);
    }

    /// Replace each cursor's selection (or insert at each cursor) with
    /// `text`. Cursors are processed from last to first.
    fn insert(&mut self, text: &str) -> Result<(), EditError> {
        self.edit_each(|_, _, cursor| {
            let range = cursor
                .selection()
                .map_or_else(|| Range::point(cursor.position()), |s| s.range());
            Some((range, text))
        })
    }

    /// Delete each cursor's selection, or the range `around` gives for a
    /// cursor without one.
    fn delete(&mut self, around: fn(&Buffer, Position) -> Option<Range>) -> Result<(), EditError> {
        self.edit_each(|buf, _, cursor| match cursor.selection() {
            Some(sel) => Some((sel.range(), "")),
            None => around(buf, cursor.position()).map(|r| (r, "")),
        })
    }

    /// For each cursor, delete a range and insert text at its start, then
    /// place the cursor after the insertion and shift the others. `plan`
    /// also gets the cursor's index in the set. All of it is one undo step.
    fn edit_each<'t>(
        &mut self,
        mut plan: impl FnMut(&Buffer, usize, &Cursor) -> Option<(Range, &'t str)>,
    ) -> Result<(), EditError> {
        self.history.begin(&self.cursors);
        for i in (0..self.cursors.len()).rev() {
            let Some(cursor) = self.cursors.get(i).copied() else {
                continue;
            };
            let Some((range, text)) = plan(&self.buffer, i, &cursor) else {
                continue;
            };

            if !range.is_empty() {
                let removed = self.buffer.delete(range)?;
                self.history.record_delete(range, &removed);
                self.cursors.shift_after_delete(i, range);
            }
            let end = self.buffer.insert(range.start, text)?;
            self.history.record_insert(Range::ordered(range.start, end), text);
            if end != range.start {
                self.cursors.shift_after_insert(i, range.start, end);
            }
            if let Some(c) = self.cursors.get_mut(i) {
                c.place(end);
            }
        }
        self.cursors.clamp(&self.buffer);
        self.history.commit(&self.cursors);
        Ok(())
    }

    // -- History ------------------------------------------------------------

    fn undo(&mut self) -> Result<(), EditError> {
        match self.history.undo(&mut self.buffer)? {
            Some(cursors) => self.restore_cursors(cursors),
            None => self.set_status(StatusKind::Info, "nothing to undo"),
        }
        Ok(())
    }

    fn redo(&mut self) -> Result<(), EditError> {
        match self.history.redo(&mut self.buffer)? {
            Some(cursors) => self.restore_cursors(cursors),
            None => self.set_status(StatusKind::Info, "nothing to redo"),
        }
        Ok(())
    }

    fn restore_cursors(&mut self, cursors: CursorSet) {
        self.cursors = cursors;
        self.cursors.clamp(&self.buffer);
    }

    // -- Line register ------------------------------------------------------

    /// Line of each cursor, by cursor index.
    fn cursor_lines(&self) -> Vec<usize> {
        self.cursors.iter().map(Cursor::line).collect()
    }

    /// Put the cursors' lines (each once, top to bottom) in the register.
    /// Returns how many lines were copied.
    fn copy_lines(&mut self) -> usize {
        let mut lines = self.cursor_lines();
        lines.dedup();
        let text: Vec<&str> = lines.iter().filter_map(|&l| self.buffer.line(l)).collect();
        self.register = Some(text.join("\n"));
        lines.len()
    }

    fn cut_lines(&mut self) -> Result<(), EditError> {
        let n = self.copy_lines();
        let lines = self.cursor_lines();
        // Only the last cursor on a line acts for it.
        self.edit_each(|buf, i, _| {
            let line = *lines.get(i)?;
            (lines.get(i + 1) != Some(&line)).then(|| (whole_line(buf, line), ""))
        })?;
        self.set_status(StatusKind::Info, format!("cut {}", plural(n, "line")));
        Ok(())
    }

    /// Insert the register as new lines below each cursor's line. The cursor
    /// ends up at the end of the pasted text.
    fn paste_lines(&mut self) -> Result<(), EditError> {
        let Some(register) = self.register.as_deref() else {
            self.set_status(StatusKind::Info, "nothing to paste");
            return Ok(());
        };
        let text = format!("\n{register}");
        let lines = self.cursor_lines();
        self.edit_each(|buf, i, _| {
            let line = *lines.get(i)?;
            let eol = Position::new(line, buf.line_len(line));
            (lines.get(i + 1) != Some(&line)).then_some((Range::point(eol), text.as_str()))
        })
    }

    // -- Search -------------------------------------------------------------

    /// Apply `f` to the prompt's query (opening the prompt if needed) and
    /// echo it in the status line.
    fn edit_query(&mut self, f: impl FnOnce(&mut String)) {
        let query = self.search.query.get_or_insert_with(String::new);
        f(query);
        let echo = format!("/{query}");
        self.set_status(StatusKind::Info, echo);
    }

    /// Close the prompt and search forward. An empty query repeats the last
    /// term.
    fn submit_search(&mut self) {
        let query = self.search.query.take().unwrap_or_default();
        if !query.is_empty() {
            self.search.term = Some(query);
        }
        self.clear_status();
        self.seek(Seek::Next);
    }

    /// Jump to the next or previous match of the current term. The jump
    /// leaves a single cursor on the match start.
    fn seek(&mut self, seek: Seek) {
        let Some(term) = self.search.term.as_deref() else {
            self.set_status(StatusKind::Info, "no search term");
            return;
        };
        let from = self.cursors.primary().position();
        let found = match seek {
            Seek::Next => search::find_next(&self.buffer, from, term),
            Seek::Prev => search::find_prev(&self.buffer, from, term),
        };
        match found {
            Some(m) => {
                tracing::debug!(term, at = %m.range.start, wrapped = m.wrapped, "search");
                self.cursors = CursorSet::new(Cursor::at(m.range.start));
                self.search.highlight = true;
                if m.wrapped {
                    self.set_status(StatusKind::Info, "search wrapped");
                } else if self.status.as_ref().is_some_and(|s| !s.is_error()) {
                    self.clear_status();
                }
            }
            None => {
                let text = format!("not found: {term}");
                self.set_status(StatusKind::Warning, text);
            }
        }
    }

    // -- Saving -------------------------------------------------------------

    /// Save to the bound path. The outcome lands in the status line.
    pub fn save(&mut self) {
        match self.try_save() {
            Ok(bytes) => {
                let path = self.display_name();
                tracing::info!(%path, bytes, "saved");
                self.set_status(StatusKind::Info, format!("wrote {bytes} bytes to {path}"));
            }
            Err(err) => {
                tracing::warn!(%err, "save failed");
                self.set_status(StatusKind::Error, format!("save failed: {err}"));
            }
        }
    }

    /// Snapshot, write, commit. Returns the byte count written.
    fn try_save(&mut self) -> Result<usize, SaveError> {
        let path = self.path.clone().ok_or(SaveError::NoPath)?;
        let snapshot = self.buffer.snapshot();
        let bytes = snapshot.serialize();
        self.store.write_file(&path, &bytes)?;
        self.buffer.commit_save(&snapshot)?;
        Ok(bytes.len())
    }
}

/// `n` and a noun, with an `s` unless `n` is 1.
fn plural(n: usize, noun: &str) -> String {
    if n == 1 { format!("1 {noun}") } else { format!("{n} {noun}s") }
}

/// Line `line` and one adjacent line break, so deleting it removes the line
/// entirely. The only line of a buffer just loses its text.
fn whole_line(buf: &Buffer, line: usize) -> Range {
    let last = buf.line_count() - 1;
    if line < last {
        Range::ordered(Position::new(line, 0), Position::new(line + 1, 0))
    } else if line > 0 {
        Range::ordered(
            Position::new(line - 1, buf.line_len(line - 1)),
            Position::new(line, buf.line_len(line)),
        )
    } else {
        Range::ordered(Position::ZERO, Position::new(0, buf.line_len(0)))
    }
}

/// The character before `pos`, or the line break before it.
fn backward_range(buf: &Buffer, pos: Position) -> Option<Range> {
    let start = match pos {
        Position { line: 0, col: 0 } => return None,
        Position { line, col: 0 } => Position::new(line - 1, buf.line_len(line - 1)),
        Position { line, col } => Position::new(line, col - 1),
    };
    Some(Range::ordered(start, pos))
}

/// The character at `pos`, or the line break after it.
fn forward_range(buf: &Buffer, pos: Position) -> Option<Range> {
    if pos == buf.end_position() {
        return None;
    }
    let end = if pos.col < buf.line_len(pos.line) {
        Position::new(pos.line, pos.col + 1)
    } else {
        Position::new(pos.line + 1, 0)
    };
    Some(Range::ordered(pos, end))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
