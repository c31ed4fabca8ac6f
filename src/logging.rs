//! File logging for the binary.
//!
//! The library only emits through the `log` facade. The binary calls
//! [`init`] once before the first pass and [`LogSession::finish`] after the
//! last one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use simplelog::{Config, LevelFilter, WriteLogger};

/// Environment variable that turns on debug logging.
pub const VERBOSE_ENV: &str = "VERBOSE_MODE";

/// Errors that can occur when setting up logging.
#[derive(Debug)]
pub enum LogError {
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },
    AlreadyInitialized(log::SetLoggerError),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::CreateDir { path, source } => {
                write!(
                    f,
                    "Failed to create log directory '{}': {}",
                    path.display(),
                    source
                )
            }
            LogError::OpenFile { path, source } => {
                write!(f, "Failed to open log file '{}': {}", path.display(), source)
            }
            LogError::AlreadyInitialized(e) => write!(f, "Logger already set: {}", e),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::CreateDir { source, .. } | LogError::OpenFile { source, .. } => {
                Some(source)
            }
            LogError::AlreadyInitialized(e) => Some(e),
        }
    }
}

/// An installed logger. Dropping it without [`finish`](Self::finish) leaves
/// buffered records to the OS.
#[derive(Debug)]
pub struct LogSession {
    path: PathBuf,
}

impl LogSession {
    /// File the session writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything logged so far.
    pub fn finish(self) {
        log::info!("Log session closed");
        log::logger().flush();
    }
}

/// `true` when `VERBOSE_MODE` is set to `true` or `1`.
pub fn verbose_from_env() -> bool {
    std::env::var(VERBOSE_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
        .unwrap_or(false)
}

/// Log file for today: `<dir>/app_<YYYY-MM-DD>.log`.
pub fn log_file_path(dir: &Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    dir.join(format!("app_{}.log", date))
}

/// Install a file logger under `log_dir`, appending to today's file.
///
/// # Arguments
/// * `log_dir` - Directory for log files, created if missing
/// * `verbose` - Log at debug level instead of info
pub fn init(log_dir: &Path, verbose: bool) -> Result<LogSession, LogError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LogError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let path = log_file_path(log_dir);
    let file = open_append(&path)?;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(level, Config::default(), file).map_err(LogError::AlreadyInitialized)?;

    log::info!("Logging to {} at {:?}", path.display(), level);
    Ok(LogSession { path })
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}
