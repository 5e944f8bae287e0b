//! Structured logging for the weathervane service
//!
//! Provides context-rich logging tagged with the pipeline component and,
//! where relevant, the station number. Supports console output and an
//! append-only log file for daemon operation.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses the level names used in the configuration file.
    pub fn parse(name: &str) -> Option<LogLevel> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Feed,
    Merge,
    Encode,
    Transport,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Feed => write!(f, "FEED"),
            Component::Merge => write!(f, "MERGE"),
            Component::Encode => write!(f, "ENCODE"),
            Component::Transport => write!(f, "XMIT"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the feed is temporarily unavailable
    Expected,
    /// Unexpected failure - the feed changed shape or the service is misconfigured
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

fn global() -> MutexGuard<'static, Option<Logger>> {
    // A panic while logging must not silence every later log line.
    LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        *global() = Some(logger);
    }

    fn log(&self, level: LogLevel, component: Component, station: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = format_entry(level, component, station, message);
        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, station_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", component, station_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// Formats one log line: `<utc timestamp> <LEVEL> <COMPONENT> [station]: message`.
pub fn format_entry(
    level: LogLevel,
    component: Component,
    station: Option<&str>,
    message: &str,
) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, component, station_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

pub fn info(component: Component, station: Option<&str>, message: &str) {
    if let Some(logger) = global().as_ref() {
        logger.log(LogLevel::Info, component, station, message);
    }
}

pub fn warn(component: Component, station: Option<&str>, message: &str) {
    if let Some(logger) = global().as_ref() {
        logger.log(LogLevel::Warning, component, station, message);
    }
}

pub fn error(component: Component, station: Option<&str>, message: &str) {
    if let Some(logger) = global().as_ref() {
        logger.log(LogLevel::Error, component, station, message);
    }
}

pub fn debug(component: Component, station: Option<&str>, message: &str) {
    if let Some(logger) = global().as_ref() {
        logger.log(LogLevel::Debug, component, station, message);
    }
}

// ---------------------------------------------------------------------------
// Feed failure classification
// ---------------------------------------------------------------------------

/// Classify a weather feed failure from its error message
pub fn classify_feed_failure(error_message: &str) -> FailureType {
    if error_message.contains("HTTP error: 5") || error_message.contains("timed out") {
        // Buienradar regularly has short outages
        FailureType::Expected
    } else if error_message.contains("HTTP error") || error_message.contains("Parse error") {
        // 4xx or a changed JSON shape means the URL or parser needs attention
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Log a feed failure with automatic classification
pub fn log_feed_failure(operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_feed_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => warn(Component::Feed, None, &message),
        FailureType::Unexpected => error(Component::Feed, None, &message),
        FailureType::Unknown => warn(Component::Feed, None, &message),
    }
}

/// Renders a frame as space-separated hex bytes for log lines.
pub fn hex_frame(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
