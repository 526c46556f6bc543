//! Logging setup for the chart tile server core and CLI.
//!
//! Each process session logs to one truncated-on-start file plus the
//! console. The default filter keeps the tile pipeline at `info` while
//! quieting the HTTP client internals; `RUST_LOG` overrides it, e.g.
//! `RUST_LOG=charttiles::jobs=debug` to watch seed workers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directory session logs land in, relative to the working directory.
pub const LOG_DIR: &str = "logs";

/// Session log file name.
pub const LOG_FILE: &str = "charttiles.log";

/// Filter used when `RUST_LOG` is unset: everything at `info`, minus the
/// connection-level chatter of the HTTP stack under a seeding worker
/// pool.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn";

/// Keeps the background log writer alive; dropping it flushes and
/// closes the session log.
pub struct LoggingGuard {
    _writer_guard: WorkerGuard,
}

/// Truncates (or creates) the session log, creating the directory chain
/// first, and returns its path.
fn start_session_log(dir: &Path, file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file);
    fs::write(&path, "")?;
    Ok(path)
}

/// Initialize logging: session file plus console.
///
/// The file layer keeps targets so `grep charttiles::cache` works on a
/// saved log; the console layer drops them for readability.
///
/// # Errors
///
/// Returns the I/O error when the log directory cannot be created or
/// the previous session log cannot be truncated.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    start_session_log(Path::new(log_dir), log_file)?;

    let (writer, writer_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_file));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let session_file = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(session_file)
        .with(console)
        .init();

    Ok(LoggingGuard {
        _writer_guard: writer_guard,
    })
}
