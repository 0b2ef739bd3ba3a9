//! Minimal leveled logging for the `fitheap` workspace.
//!
//! Provides a process-wide logger with atomic level filtering, colored
//! stderr output, and automatic module-path targets. The level is picked up
//! from the `FITHEAP_LOG` environment variable on first use and can be
//! changed at any time with [`set_level`].
//!
//! # Example
//!
//! ```
//! use fitheap_log::{info, debug, set_level, Level};
//!
//! set_level(Level::Debug);
//! info!("heap ready");
//! debug!("free list holds {} blocks", 1);
//! ```

use std::fmt::Arguments;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity of a log message, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Unrecoverable conditions, reported just before aborting.
    Error = 0,
    /// Suspicious but survivable situations.
    Warn = 1,
    /// High-level lifecycle events.
    Info = 2,
    /// Per-operation diagnostics.
    Debug = 3,
    /// Hot-path tracing.
    Trace = 4,
}

impl Level {
    /// Uppercase tag printed in the log line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn color(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError),
        }
    }
}

/// Returned when a string does not name a log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLevelError;

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown log level (expected error, warn, info, debug, or trace)")
    }
}

impl std::error::Error for ParseLevelError {}

/// Process-wide logger with an atomic minimum level.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    fn from_env() -> Self {
        let level = std::env::var("FITHEAP_LOG")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Level::Warn);

        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the minimum level; messages below it are dropped.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// True if a message at `level` would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// The global logger, initialized from `FITHEAP_LOG` on first access.
///
/// Defaults to [`Level::Warn`] when the variable is unset or unparsable.
pub fn logger() -> &'static Logger {
    LOGGER.get_or_init(Logger::from_env)
}

/// Sets the global minimum log level.
pub fn set_level(level: Level) {
    logger().set_level(level);
}

/// Emits one formatted line to stderr. Called by the macros after the
/// level check has already passed.
#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments) {
    const RESET: &str = "\x1b[0m";
    eprintln!("{}[{}]{} {}: {}", level.color(), level.as_str(), RESET, target, args);
}

/// Logs at an explicit level, capturing the caller's module path.
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        if $crate::logger().enabled($level) {
            $crate::__emit($level, module_path!(), format_args!($($arg)*));
        }
    };
}

/// Logs at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`](crate::Level::Warn).
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`](crate::Level::Info).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`](crate::Level::Trace).
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
