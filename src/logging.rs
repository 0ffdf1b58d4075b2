//! Logging infrastructure for the fan controller daemon.
//!
//! Provides log output to a file and to stdout:
//! - Appends to the configured log file (kept across restarts)
//! - Also prints to stdout for journald / interactive tailing
//! - Configurable via the RUST_LOG environment variable
//!
//! Library code logs through the `log` facade; `init()` installs the
//! `log` → `tracing` bridge so those records reach both layers.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default log file of the daemon.
pub const DEFAULT_LOG_FILE: &str = "/var/log/hybridfan.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging to `log_path` and stdout.
///
/// Creates the parent directory if needed. Fails if the directory cannot
/// be created or the file cannot be opened for append; the control loop
/// must not start without a log.
pub fn init_logging(log_path: &Path) -> Result<LoggingGuard, io::Error> {
    let (dir, file) = prepare_log_file(log_path)?;

    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    // Defaults to INFO if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Create the log directory and open the file for append once, so
/// permission problems surface here rather than from the writer thread.
fn prepare_log_file(log_path: &Path) -> Result<(&Path, &std::ffi::OsStr), io::Error> {
    let (dir, file) = split_log_path(log_path)?;
    fs::create_dir_all(dir)?;
    fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    Ok((dir, file))
}

/// Split a log path into its directory and file name.
fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), io::Error> {
    let file = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", path.display()),
        )
    })?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok((dir, file))
}
