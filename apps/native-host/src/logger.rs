//! Logging for the bridge binaries.
//!
//! Provides dual output (stderr with colors + file) with thread-safe initialization.
//! Stdout is never used: the helper's stdout carries the browser protocol.

use crate::error::NativeHostError;

use common::ErrorLocation;

use std::fmt::{Arguments, Display};
use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::{Dispatch, FormatCallback};
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Log file of the helper process.
pub const HOST_LOG_FILE_NAME: &str = "native-host.log";

/// Log file of the application.
pub const APP_LOG_FILE_NAME: &str = "bridge-app.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Default log level for debug builds.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Default log level for release builds.
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize the logger with dual output (stderr + `log_dir/file_name`).
///
/// Safe to call multiple times: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns an error if:
/// - Log file cannot be created
/// - Logger dispatch configuration fails
pub fn initialize(
    log_dir: &Path,
    file_name: &str,
    level: LevelFilter,
) -> Result<(), NativeHostError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, file_name, level);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

/// `[<rfc3339> - <LEVEL>] <message> [<file>:<line>]`
fn finish_record(
    out: FormatCallback<'_>,
    message: &Arguments<'_>,
    record: &Record<'_>,
    level: &dyn Display,
) {
    out.finish(format_args!(
        "[{date} - {level}] {message} [{file}:{line}]",
        date = format_rfc3339(SystemTime::now()),
        file = record.file().unwrap_or("unknown"),
        line = record.line().unwrap_or(0),
    ));
}

#[track_caller]
fn initialize_internal(
    log_dir: &Path,
    file_name: &str,
    level: LevelFilter,
) -> Result<(), NativeHostError> {
    let location = ErrorLocation::from(Location::caller());
    let log_file_path = log_dir.join(file_name);

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let log_file = fern::log_file(&log_file_path).map_err(|e| NativeHostError::Logger {
        message: format!("Failed to create log file {}: {e}", log_file_path.display()),
        location,
    })?;

    let console = Dispatch::new()
        .format(move |out, message, record| {
            finish_record(out, message, record, &colors.color(record.level()))
        })
        .chain(stderr());

    let file = Dispatch::new()
        .format(|out, message, record| finish_record(out, message, record, &record.level()))
        .chain(log_file);

    Dispatch::new()
        .level(level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(|e| NativeHostError::Logger {
            message: format!("Failed to initialize logger: {e}"),
            location,
        })
}
