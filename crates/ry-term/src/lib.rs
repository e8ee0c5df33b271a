// SPDX-License-Identifier: MIT
//
// ry-term — the terminal side of ry.
//
// Raw mode, key decoding and ANSI output, behind one trait. The editor core
// depends on `TerminalIo`, `InputEvent` and `Frame` and nothing else from
// here, so it can be driven by `ScriptedTerminal` in tests and by `Tty`
// for real.
//
// No TUI framework: direct termios and escape sequences. Every frame goes
// out in one write inside a synchronized-output block.

pub mod ansi;
pub mod cell;
pub mod input;
pub mod io;
pub mod output;
pub mod script;
pub mod terminal;
pub mod tty;

pub use cell::{Attr, CellWrite, Frame};
pub use input::{InputEvent, Modifiers, SpecialKey};
pub use io::{RawModeGuard, TerminalIo};
pub use script::ScriptedTerminal;
pub use terminal::Size;
pub use tty::{TerminalInitError, Tty};
