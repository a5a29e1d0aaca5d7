//! Log routing for the sync binary.
//!
//! Stdout is reserved for the progress lines, so tracing output goes to stderr and to a log
//! file. `DRIVE_SYNC_LOG_FILE` overrides the file location (default `logs/drive-pdf-sync.log`).
//! `RUST_LOG` filters both sinks and falls back to `info`.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "DRIVE_SYNC_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/drive-pdf-sync.log";

// Dropping the guard would stop the background writer and lose buffered lines.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Must be called once, before any client is built.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let file_layer = open_log_file(&log_file_path()).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn log_file_path() -> PathBuf {
    resolve_log_file(std::env::var(LOG_FILE_ENV).ok())
}

fn resolve_log_file(configured: Option<String>) -> PathBuf {
    configured
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Opens `path` for appending; file logging is skipped (with a note on stderr) on failure.
fn open_log_file(path: &Path) -> Option<NonBlocking> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(dir)
    {
        eprintln!("Failed to create log directory {}: {err}", dir.display());
        return None;
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
