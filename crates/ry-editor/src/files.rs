//! File loader/saver — the session's only route to the filesystem.
//!
//! [`FileStore`] is a two-method seam: raw bytes in, raw bytes out. Decoding
//! and line endings belong to the buffer. [`FsStore`] is the real
//! filesystem; [`MemoryStore`] keeps files in a map so sessions can be
//! tested without touching disk.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::FileError;

/// Reads and writes whole files.
pub trait FileStore {
    /// # Errors
    ///
    /// [`FileError`] if the file cannot be read.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileError>;

    /// Replace the file's content with `bytes`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`FileError`] if the file cannot be written.
    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), FileError>;
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FileStore for FsStore {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileError> {
        fs::read(path).map_err(|err| FileError::from_io(path, err))
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), FileError> {
        fs::write(path, bytes).map_err(|err| FileError::from_io(path, err))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Files in a map. Paths listed with [`deny`](Self::deny) fail with
/// permission denied, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<PathBuf, Vec<u8>>,
    denied: Vec<PathBuf>,
    writes: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }

    /// Make every read and write of `path` fail.
    #[must_use]
    pub fn deny(mut self, path: impl Into<PathBuf>) -> Self {
        self.denied.push(path.into());
        self
    }

    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(Vec::as_slice)
    }

    /// Successful writes so far.
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.writes
    }

    fn check(&self, path: &Path) -> Result<(), FileError> {
        if self.denied.iter().any(|p| p == path) {
            return Err(FileError::from_io(
                path,
                io::Error::from(io::ErrorKind::PermissionDenied),
            ));
        }
        Ok(())
    }
}

impl FileStore for MemoryStore {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileError> {
        self.check(path)?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FileError::NotFound(path.to_path_buf()))
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), FileError> {
        self.check(path)?;
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let mut store = FsStore;

        store.write_file(&path, b"one\ntwo").unwrap();
        assert_eq!(store.read_file(&path).unwrap(), b"one\ntwo");
        store.write_file(&path, b"three").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"three");
    }

    #[test]
    fn fs_store_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let err = FsStore.read_file(&path).unwrap_err();
        assert!(matches!(err, FileError::NotFound(p) if p == path));
    }

    #[test]
    fn fs_store_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/file.txt");
        assert!(FsStore.write_file(&path, b"x").is_err());
    }

    #[test]
    fn memory_store_reads_and_writes() {
        let mut store = MemoryStore::new().with_file("a.txt", "hello");
        assert_eq!(store.read_file(Path::new("a.txt")).unwrap(), b"hello");
        store.write_file(Path::new("b.txt"), b"bye").unwrap();
        assert_eq!(store.get("b.txt"), Some(&b"bye"[..]));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn memory_store_errors() {
        let mut store = MemoryStore::new().deny("locked.txt");
        assert!(matches!(
            store.read_file(Path::new("missing.txt")),
            Err(FileError::NotFound(_))
        ));
        assert!(matches!(
            store.write_file(Path::new("locked.txt"), b"x"),
            Err(FileError::PermissionDenied(_))
        ));
        assert_eq!(store.write_count(), 0);
    }
}
