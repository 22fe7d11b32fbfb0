//! Bedtime Configuration System
//!
//! TOML configuration for the player: application paths and logging,
//! session defaults and resource-loading policy.
//!
//! # Architecture
//!
//! - **Trait-based**: Each section implements `ConfigSection`
//! - **Graceful degradation**: Invalid files load with warnings so they can be fixed
//! - **Atomic writes**: Config files are never left in a corrupted state
//!
//! # Example
//!
//! ```rust
//! use bedtime_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Volume: {}", config.session.volume);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod audio_config;
mod session_config;

pub use error::{ConfigError, ConfigResult, FileAction, ValidationError};
pub use manager::{ConfigManager, ENV_OVERRIDES};
pub use validation::{ConfigSection, FieldChecks};

pub use app_config::{AppConfig, LogLevel};
pub use audio_config::AudioConfig;
pub use session_config::SessionConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Defaults applied to new sessions
    pub session: SessionConfig,

    /// Asset loading
    pub audio: AudioConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.session.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.audio.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.session.merge(other.session);
        self.audio.merge(other.audio);
    }

    /// Sets one value addressed as `section.field`
    ///
    /// The value is parsed according to the field's type. The result is not
    /// validated; call [`Config::validate`] or save through the manager.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        match section {
            "app" => self.app.set_field(field, value),
            "session" => self.session.set_field(field, value),
            "audio" => self.audio.set_field(field, value),
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

/// Parses `value` for `key`, mapping failures to [`ConfigError::InvalidValue`]
pub(crate) fn parse_field<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}
