//! # ry-editor — Editor core for ry
//!
//! Everything between a decoded key and a rendered frame:
//!
//! - **[`position`]** — `Position` (line, col) and `Range`, 0-indexed
//! - **[`lines`]** — gap buffer of lines backing the text buffer
//! - **[`buffer`]** — `Buffer` with insert/delete, load/serialize, line endings, save snapshots
//! - **[`cursor`]** — `Cursor` with sticky column and selection, `CursorSet` for multiple cursors
//! - **[`word`]** — word boundaries for Ctrl+Left / Ctrl+Right
//! - **[`history`]** — undo/redo, one transaction per command
//! - **[`search`]** — literal search with wrap-around
//! - **[`keymap`]** — key chords and the chord → command table
//! - **[`command`]** — `Command`, `Mode`, and the `Interpreter` transition function
//! - **[`render`]** — viewport scrolling and the diffing `Renderer`
//! - **[`files`]** — the `FileStore` seam, real and in-memory
//! - **[`config`]** — TOML configuration
//! - **[`session`]** — the editor state and its loop
//! - **[`error`]** — error types
//!
//! The terminal itself is behind `ry_term::TerminalIo`, so the whole loop
//! runs against `ry_term::ScriptedTerminal` in tests.

pub mod buffer;
pub mod command;
pub mod config;
pub mod cursor;
pub mod error;
pub mod files;
pub mod history;
pub mod keymap;
pub mod lines;
pub mod position;
pub mod render;
pub mod search;
pub mod session;
pub mod word;

pub use session::{Flow, Session, Status, StatusKind};
