//! Tracing setup for the CLI.
//!
//! Events go to stderr, keeping stdout for reports and JSON, and to one log
//! file per launch under the app's `logs` directory. Only the newest
//! [`MAX_LOG_FILES`] files are kept.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "dancecoach";
/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info";

const FILE_NAME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const EVENT_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    Dir(#[from] AppDirError),
    #[error("Failed to name the log file: {0}")]
    Name(#[from] time::error::Format),
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install tracing subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Log file written by the current launch.
#[derive(Debug)]
struct LaunchLog {
    dir: PathBuf,
    name: String,
}

impl LaunchLog {
    /// Name the file after `started` and create it empty inside `dir`.
    fn create(dir: PathBuf, started: OffsetDateTime) -> Result<Self, LoggingError> {
        let stamp = started.format(FILE_NAME_FORMAT)?;
        let log = Self {
            dir,
            name: format!("{LOG_FILE_PREFIX}_{stamp}.log"),
        };
        let path = log.path();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::Open { path, source })?;
        Ok(log)
    }

    fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Install the global subscriber. Calling it again does nothing.
///
/// An error leaves tracing uninstalled; the CLI keeps running without logs.
pub fn init() -> Result<(), LoggingError> {
    if FILE_WRITER_GUARD.get().is_some() {
        return Ok(());
    }
    let log = LaunchLog::create(app_dirs::logs_dir()?, now_local_or_utc())?;
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log.dir, &log.name));

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(offset, EVENT_TIME_FORMAT);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = FILE_WRITER_GUARD.set(guard);

    let removed = prune_logs(&log.dir, MAX_LOG_FILES);
    tracing::debug!(
        "Writing log to {} ({removed} old log files removed)",
        log.path().display()
    );
    Ok(())
}

/// Delete all but the `keep` most recently modified `.log` files in `dir`.
///
/// Failures are logged and skipped. Returns how many files were removed.
fn prune_logs(dir: &Path, keep: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("Cannot list log directory {}: {err}", dir.display());
            return 0;
        }
    };
    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    logs.sort_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => tracing::warn!("Cannot remove old log {}: {err}", path.display()),
        }
    }
    removed
}

/// Current local time, falling back to UTC when the offset is unknown.
pub(crate) fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn file_names(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn launch_log_is_named_after_start_time() {
        let dir = tempdir().unwrap();
        let started = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let log = LaunchLog::create(dir.path().to_path_buf(), started).unwrap();
        assert_eq!(log.name, "dancecoach_2023-11-14_22-13-20.log");
        assert!(log.path().is_file());
    }

    #[test]
    fn launch_log_reports_unopenable_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let err = LaunchLog::create(missing, now_local_or_utc()).unwrap_err();
        assert!(matches!(err, LoggingError::Open { .. }));
        assert!(err.to_string().starts_with("Failed to open log file"));
    }

    #[test]
    fn pruning_keeps_newest_logs_and_other_files() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            fs::write(dir.path().join(format!("dancecoach_{idx:02}.log")), b"").unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        assert_eq!(prune_logs(dir.path(), MAX_LOG_FILES), 2);
        let remaining = file_names(dir.path());
        assert_eq!(remaining.iter().filter(|name| name.ends_with(".log")).count(), MAX_LOG_FILES);
        assert!(remaining.iter().any(|name| name == "notes.txt"));
        assert!(!remaining.iter().any(|name| name == "dancecoach_00.log"));
        assert!(!remaining.iter().any(|name| name == "dancecoach_01.log"));
    }

    #[test]
    fn pruning_a_missing_directory_removes_nothing() {
        let dir = tempdir().unwrap();
        assert_eq!(prune_logs(&dir.path().join("gone"), MAX_LOG_FILES), 0);
    }
}
