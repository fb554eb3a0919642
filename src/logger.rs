//! Runtime logging
//!
//! A logger is a sink plus a minimum severity. The crate logs through one
//! process-wide runtime logger which forwards to the `log` facade until a
//! caller installs something else (the CLI installs [`StderrSink`]).
//!
//! ```rust
//! use std::sync::Arc;
//! use zodiac::logger::{LogLevel, Logger, MemorySink};
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::new(sink.clone()).with_min_level(LogLevel::Warning);
//!
//! logger.log(LogLevel::Info, "dropped");
//! logger.log(LogLevel::Error, "kept");
//!
//! assert_eq!(sink.records(), vec![(LogLevel::Error, "kept".to_string())]);
//! ```

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Log severity, from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Detailed diagnostic information
    Debug = 0,
    /// General information
    Info = 1,
    /// Normal but significant condition
    Notice = 2,
    /// Potential problem
    Warning = 3,
    /// Error condition
    Error = 4,
    /// Critical condition
    Critical = 5,
    /// Immediate action needed
    Alert = 6,
    /// System is unusable
    Emergency = 7,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Alert,
        LogLevel::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Alert => "ALERT",
            LogLevel::Emergency => "EMERGENCY",
        }
    }

    /// Closest `log` crate level. The facade has fewer levels, so several
    /// severities collapse onto `Info` and `Error`.
    pub fn to_log_level(&self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info | LogLevel::Notice => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error | LogLevel::Critical | LogLevel::Alert | LogLevel::Emergency => {
                log::Level::Error
            }
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "notice" => LogLevel::Notice,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            "critical" => LogLevel::Critical,
            "alert" => LogLevel::Alert,
            "emergency" => LogLevel::Emergency,
            _ => return Err(ParseLevelError(s.to_string())),
        };
        Ok(level)
    }
}

/// Destination for log messages.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards to the `log` crate facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacadeSink;

impl LogSink for LogFacadeSink {
    fn log(&self, level: LogLevel, message: &str) {
        log::log!(target: "zodiac", level.to_log_level(), "{}", message);
    }
}

/// Writes `[LEVEL] message` lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn log(&self, level: LogLevel, message: &str) {
        eprintln!("[{}] {}", level, message);
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().push((level, message.to_string()));
    }
}

/// A sink with a severity threshold.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    min_level: LogLevel,
}

impl Logger {
    /// Create a logger that passes every level through
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            min_level: LogLevel::Debug,
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if self.enabled(level) {
            self.sink.log(level, message);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(LogFacadeSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

static RUNTIME_LOGGER: Lazy<RwLock<Logger>> = Lazy::new(|| RwLock::new(Logger::default()));

/// Replace the process-wide runtime logger
pub fn set_runtime_logger(logger: Logger) {
    *RUNTIME_LOGGER.write() = logger;
}

/// A handle to the current runtime logger
pub fn runtime_logger() -> Logger {
    RUNTIME_LOGGER.read().clone()
}

/// Backend of the `rt_*!` macros. Formatting is skipped for filtered levels.
#[doc(hidden)]
pub fn runtime_log(level: LogLevel, args: fmt::Arguments<'_>) {
    let logger = RUNTIME_LOGGER.read();
    if logger.enabled(level) {
        logger.sink.log(level, &args.to_string());
    }
}

#[macro_export]
macro_rules! rt_debug {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_info {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_notice {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Notice, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_warning {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Warning, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_error {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_critical {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Critical, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_alert {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Alert, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! rt_emergency {
    ($($arg:tt)*) => {
        $crate::logger::runtime_log($crate::logger::LogLevel::Emergency, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        let names: Vec<&str> = LogLevel::ALL.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            names,
            vec!["DEBUG", "INFO", "NOTICE", "WARNING", "ERROR", "CRITICAL", "ALERT", "EMERGENCY"]
        );
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Alert < LogLevel::Emergency);
        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" Emergency ".parse::<LogLevel>(), Ok(LogLevel::Emergency));
        assert!("verbose".parse::<LogLevel>().is_err());

        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn test_facade_mapping() {
        assert_eq!(LogLevel::Notice.to_log_level(), log::Level::Info);
        assert_eq!(LogLevel::Warning.to_log_level(), log::Level::Warn);
        assert_eq!(LogLevel::Emergency.to_log_level(), log::Level::Error);
    }

    #[test]
    fn test_logger_filters_below_threshold() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone()).with_min_level(LogLevel::Notice);

        logger.log(LogLevel::Debug, "debug");
        logger.log(LogLevel::Info, "info");
        logger.log(LogLevel::Notice, "notice");
        logger.log(LogLevel::Critical, "critical");

        assert_eq!(
            sink.records(),
            vec![
                (LogLevel::Notice, "notice".to_string()),
                (LogLevel::Critical, "critical".to_string()),
            ]
        );

        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_runtime_logger_macros() {
        let sink = Arc::new(MemorySink::new());
        set_runtime_logger(Logger::new(sink.clone()).with_min_level(LogLevel::Alert));
        assert_eq!(runtime_logger().min_level(), LogLevel::Alert);

        crate::rt_alert!("controller {} unavailable", 4);
        crate::rt_emergency!("halt");

        let records = sink.records();
        assert!(records.contains(&(LogLevel::Alert, "controller 4 unavailable".to_string())));
        assert!(records.contains(&(LogLevel::Emergency, "halt".to_string())));
        assert!(records.iter().all(|(level, _)| *level >= LogLevel::Alert));

        set_runtime_logger(Logger::default());
    }
}
