//! Logging for the `pysrun` binary.
//!
//! Output goes to stderr (stdout carries the HTML or frame) and, when a log
//! directory is given, to a plain-text file in it. Initialization is
//! thread-safe and idempotent.

use crate::error::PysrunError;

use common::ErrorLocation;

use std::fs::File;
use std::io::stderr;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Log file name.
pub const LOG_FILE_NAME: &str = "pysrun.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";
const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Level for a `-v` count: none is Info, one is Debug, more is Trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the logger on stderr, plus `<log_dir>/pysrun.log` if given.
///
/// Safe to call multiple times: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns an error if:
/// - The log file cannot be created
/// - Logger dispatch configuration fails
pub fn initialize(level: LevelFilter, log_dir: Option<&Path>) -> Result<(), PysrunError> {
    let log_file = log_dir.map(open_log_file).transpose()?;

    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(level, log_file);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

#[track_caller]
fn open_log_file(log_dir: &Path) -> Result<File, PysrunError> {
    fern::log_file(log_dir.join(LOG_FILE_NAME)).map_err(|e| PysrunError::Pysrun {
        message: format!("Failed to create log file in {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn initialize_internal(level: LevelFilter, log_file: Option<File>) -> Result<(), PysrunError> {
    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stderr_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stderr());

    let mut base_dispatch = Dispatch::new().level(level).chain(stderr_dispatch);

    // File output is plain text, no colors
    if let Some(log_file) = log_file {
        let file_dispatch = Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "[{date} - {level}] {message} [{file}:{line}]",
                    date = format_rfc3339(SystemTime::now()),
                    level = record.level(),
                    message = message,
                    file = record.file().unwrap_or("unknown"),
                    line = record.line().unwrap_or(0)
                ))
            })
            .chain(log_file);
        base_dispatch = base_dispatch.chain(file_dispatch);
    }

    base_dispatch.apply().map_err(|e| PysrunError::Pysrun {
        message: format!("Failed to initialize logger: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(())
}
