//! Editor configuration, read from TOML.
//!
//! ```toml
//! [editor]
//! tab_width = 4
//! tabs_to_spaces = true
//! line_numbers = true
//! line_ending = "lf"      # for new files: lf | crlf | cr
//! undo_limit = 1000
//!
//! [keys]
//! "ctrl-s" = "save"
//! "ctrl-q" = "quit"
//! ```
//!
//! Every field is optional; `#[serde(default)]` fills in the rest. The file
//! lives at `<config dir>/ry/config.toml` unless a path is given.
//! Configuration is data only. Nothing in it is executed.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::buffer::LineEnding;
use crate::history::History;
use crate::keymap::{Keymap, KeymapError};

/// Why the configuration could not be read. The editor falls back to the
/// defaults.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub editor: EditorConfig,
    /// Chord → command name overrides.
    pub keys: BTreeMap<String, String>,
}

/// The `[editor]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub tab_width: usize,
    pub tabs_to_spaces: bool,
    pub line_numbers: bool,
    /// Line ending for files that do not exist yet.
    pub line_ending: LineEnding,
    /// Undo steps kept per buffer.
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            tabs_to_spaces: true,
            line_numbers: true,
            line_ending: LineEnding::Lf,
            undo_limit: History::DEFAULT_LIMIT,
        }
    }
}

impl Config {
    /// `<config dir>/ry/config.toml`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] if the platform has no config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("ry").join("config.toml"))
    }

    /// Parse TOML text. `path` only labels errors.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on invalid TOML or unknown keys.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.editor.tab_width = config.editor.tab_width.clamp(1, 16);
        Ok(config)
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not valid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load the explicit `path`, or the default location when `None`.
    ///
    /// A missing default file is not an error. Any failure yields the
    /// defaults plus the error to report.
    #[must_use]
    pub fn load(path: Option<&Path>) -> (Self, Option<ConfigError>) {
        let result = match path {
            Some(path) => Self::load_from(path),
            None => Self::default_path().and_then(|path| {
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }),
        };
        match result {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// The default keymap with the `[keys]` overrides applied.
    #[must_use]
    pub fn keymap(&self) -> (Keymap, Vec<KeymapError>) {
        let mut keymap = Keymap::default();
        let errors = keymap.apply_overrides(self.keys.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        (keymap, errors)
    }
}
