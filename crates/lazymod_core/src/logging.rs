//! Logging bootstrap and panic payload hygiene.
//!
//! # Responsibility
//! - Start rolling file logs exactly once per process.
//! - Turn panic payloads into bounded, single-line messages.
//!
//! # Invariants
//! - Re-initialization with the same level and directory is a no-op.
//! - Re-initialization with a different level or directory is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "lazymod";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_MESSAGE_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unsupported log level `{other}`; expected trace|debug|info|warn|error"
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Requested logger settings after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: LogLevel,
    directory: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        let level = LogLevel::parse(level)?;
        let trimmed = log_dir.trim();
        if trimmed.is_empty() {
            return Err("log directory cannot be empty".to_string());
        }
        let directory = PathBuf::from(trimmed);
        if !directory.is_absolute() {
            return Err(format!("log directory must be absolute, got `{trimmed}`"));
        }
        Ok(Self { level, directory })
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn ensure_matches(&self, requested: &LogSettings) -> Result<(), String> {
        let active = &self.settings;
        if active.directory != requested.directory {
            return Err(format!(
                "logging already writes to `{}`; refusing to switch to `{}`",
                active.directory.display(),
                requested.directory.display()
            ));
        }
        if active.level != requested.level {
            return Err(format!(
                "logging already runs at `{}`; refusing to switch to `{}`",
                active.level.as_str(),
                requested.level.as_str()
            ));
        }
        Ok(())
    }
}

/// Starts file logging under `log_dir` at `level`.
///
/// # Errors
/// - Unsupported `level`, empty or relative `log_dir`.
/// - Directory creation or logger backend failure.
/// - A conflicting earlier initialization.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogSettings::parse(level, log_dir)?;
    ACTIVE
        .get_or_try_init(|| start(requested.clone()))?
        .ensure_matches(&requested)
}

fn start(settings: LogSettings) -> Result<ActiveLogger, String> {
    let directory: &Path = &settings.directory;
    std::fs::create_dir_all(directory)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", directory.display()))?;

    let handle = Logger::try_with_str(settings.level.as_str())
        .map_err(|err| format!("logger rejected level `{}`: {err}", settings.level.as_str()))?
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("logger backend failed to start: {err}"))?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} version={}",
        settings.level.as_str(),
        directory.display(),
        crate::core_version()
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

/// Returns `(level, log_dir)` once logging is active.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE.get().map(|active| {
        (
            active.settings.level.as_str(),
            active.settings.directory.clone(),
        )
    })
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    let level = if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    level.as_str()
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = match info.location() {
            Some(location) => format!("{}:{}", location.file(), location.line()),
            None => "unknown".to_string(),
        };
        error!(
            "event=panic_captured module=logging status=error location={location} payload={}",
            panic_payload_message(info.payload())
        );
        chained(info);
    }));
}

/// Single-line, length-capped rendering of a panic payload.
pub(crate) fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
    let raw = match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(text), _) => *text,
        (None, Some(text)) => text.as_str(),
        (None, None) => "non-string panic payload",
    };
    single_line(raw, PANIC_MESSAGE_LIMIT)
}

fn single_line(value: &str, limit: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    if flattened.chars().count() <= limit {
        return flattened;
    }
    let mut capped: String = flattened.chars().take(limit).collect();
    capped.push_str("...");
    capped
}
