//! Logging utilities.
//!
//! Log levels as they appear in host configuration, and their mapping onto
//! `tracing` levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Log level, ordered by increasing severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose debug information.
    Trace,

    /// Debug information.
    Debug,

    /// Informational messages.
    #[default]
    Info,

    /// Warning messages.
    #[serde(alias = "warn")]
    Warning,

    /// Error messages.
    Error,
}

impl LogLevel {
    /// Get the name of this log level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Check if this log level is at least as severe as the given level.
    pub fn is_at_least(&self, level: LogLevel) -> bool {
        *self >= level
    }
}

impl FromStr for LogLevel {
    type Err = ();

    /// Case-insensitive parse; `warn` and `err` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("err".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(LogLevel::Error.is_at_least(LogLevel::Warning));
        assert!(!LogLevel::Debug.is_at_least(LogLevel::Info));
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_tracing_level() {
        assert_eq!(tracing::Level::from(LogLevel::Warning), tracing::Level::WARN);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
    }

    #[test]
    fn test_serde_alias() {
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warning);
        assert_eq!(serde_json::to_string(&LogLevel::Debug).unwrap(), "\"debug\"");
    }
}
