//! Application-level configuration section

use crate::validation::{ConfigSection, FieldChecks, ValidationError};
use crate::{parse_field, ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Log level for application output
    pub log_level: LogLevel,

    /// Directory holding one audio file per sound name
    pub assets_dir: PathBuf,
}

impl AppConfig {
    /// `<platform data dir>/sounds`, or `./sounds` when no home directory exists
    pub fn default_assets_dir() -> PathBuf {
        ProjectDirs::from("", "", "bedtime")
            .map(|dirs| dirs.data_dir().join("sounds"))
            .unwrap_or_else(|| PathBuf::from("sounds"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            assets_dir: Self::default_assets_dir(),
        }
    }
}

impl ConfigSection for AppConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        FieldChecks::new(self.section_name())
            .ensure(
                !self.assets_dir.as_os_str().is_empty(),
                "assets_dir",
                "must not be empty",
            )
            .finish()
    }

    fn merge(&mut self, other: Self) {
        self.log_level = other.log_level;
        self.assets_dir = other.assets_dir;
    }

    fn section_name(&self) -> &'static str {
        "app"
    }

    fn set_field(&mut self, field: &str, value: &str) -> ConfigResult<()> {
        match field {
            "log_level" => self.log_level = parse_field("app.log_level", value)?,
            "assets_dir" => self.assets_dir = PathBuf::from(value.trim()),
            _ => return Err(ConfigError::UnknownKey(format!("app.{}", field))),
        }
        Ok(())
    }
}
