// SPDX-License-Identifier: MIT
//
// ry — a small terminal text editor.
//
// This binary is the startup collaborator. It wires the two crates
// together and owns everything that happens before and after the loop:
//
//   ry-term   → raw mode, key decoding, frame output (the `Tty`)
//   ry-editor → buffer, cursors, interpreter, renderer (the `Session`)
//
// Order of events:
//
//   parse args → start logging → load config (errors to stderr)
//   → open the tty (not a tty: exit 1, raw mode never entered)
//   → open the file → session.run(tty) → exit 0, or 1 on a fatal error
//
// Logs never go to the terminal the editor draws on. They go to
// `<cache dir>/ry/ry.log` (or `--log FILE`), filtered by `RY_LOG`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ry_editor::config::{Config, ConfigError};
use ry_editor::files::FsStore;
use ry_editor::{Session, StatusKind};
use ry_term::Tty;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ry", version, about = "A small terminal text editor", long_about = None)]
struct Cli {
    /// File to edit (created on first save if it does not exist)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Configuration file [default: <config dir>/ry/config.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file [default: <cache dir>/ry/ry.log]
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Filter variable, same syntax as `RUST_LOG`.
const LOG_ENV: &str = "RY_LOG";

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("ry").join("ry.log"))
}

/// Route tracing to a file. Returns the guard that flushes the background
/// writer; it must live until exit. Logging is skipped (with a note on
/// stderr) if the file cannot be opened.
fn init_logging(path: Option<&Path>) -> Option<WorkerGuard> {
    let path = path.map(Path::to_path_buf).or_else(default_log_path)?;
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file = fs::create_dir_all(dir).and_then(|()| {
        fs::OpenOptions::new().create(true).append(true).open(&path)
    });
    let file = match file {
        Ok(file) => file,
        Err(err) => {
            eprintln!("ry: cannot open log file {}: {err}", path.display());
            return None;
        }
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .init();
    Some(guard)
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> anyhow::Result<()> {
    let (config, config_error) = Config::load(cli.config.as_deref());
    let config_error = config_error.filter(|err| !matches!(err, ConfigError::NoConfigDir));
    if let Some(err) = &config_error {
        eprintln!("ry: config: {err} (using defaults)");
        tracing::warn!(%err, "config not loaded");
    }

    // Before raw mode: failing here leaves nothing to restore.
    let mut tty = Tty::open().context("cannot start the terminal")?;

    let mut session = Session::new(FsStore, &config);
    if let Some(path) = &cli.path {
        session.open(path);
    }
    session.customize(|s| {
        if let Some(err) = &config_error {
            s.set_status(StatusKind::Warning, format!("config: {err}"));
        }
    });

    session.run(&mut tty).context("editor stopped")?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log.as_deref());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), path = ?cli.path, "starting");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("ry: {err:#}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
