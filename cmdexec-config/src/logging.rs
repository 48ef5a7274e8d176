//! Log sink configuration

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Level names accepted in `log.level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Minimum level (error, warn, info, debug, trace)
    #[serde(default = "default_level")]
    pub level: String,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Parsed level, or [`LogLevel::Info`] when unrecognized.
    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.level).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            LogLevel::parse(&self.level).is_some(),
            "log.level must be one of error, warn, info, debug, trace (got '{}')",
            self.level
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(LogLevel::parse(" DEBUG "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn rejects_unknown_level() {
        let config = LogConfig {
            level: "loud".into(),
            file: None,
        };
        assert!(config.validate().is_err());
        assert_eq!(config.level(), LogLevel::Info);
        assert!(LogConfig::default().validate().is_ok());
    }
}
