//! Error types shared across the editor core.
//!
//! Two families with very different fates:
//!
//! - [`EditError`] is an invariant violation. Clamping should make it
//!   unreachable; if it surfaces inside the loop the session stops.
//! - [`FileError`], [`SaveError`] and [`DecodeError`] are ordinary user-facing
//!   problems. They become a status message and the editor keeps running.

use std::io;
use std::path::PathBuf;

use crate::position::Position;

/// A buffer or cursor operation was handed a position outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("position {pos} is outside the buffer ({lines} lines)")]
    OutOfBounds { pos: Position, lines: usize },
}

/// Invalid UTF-8 found while loading. The buffer is still produced, with
/// each bad sequence replaced by U+FFFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{invalid} invalid UTF-8 sequence(s), first at byte {first_offset}")]
pub struct DecodeError {
    pub invalid: usize,
    pub first_offset: usize,
}

/// Reading or writing a file failed.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),
    #[error("{}: permission denied", .0.display())]
    PermissionDenied(PathBuf),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { path, source: err },
        }
    }
}

/// Why a save did not happen.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no file name")]
    NoPath,
    #[error(transparent)]
    File(#[from] FileError),
    /// The buffer changed between the snapshot and the end of the write.
    #[error("buffer changed during save (saved v{saved}, now v{current})")]
    Conflict { saved: u64, current: u64 },
}

/// Fatal conditions that end [`Session::run`](crate::session::Session::run).
///
/// Raw mode has already been left by the time the caller sees one of these.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),
    #[error("internal invariant violated: {0}")]
    Invariant(#[from] EditError),
}
