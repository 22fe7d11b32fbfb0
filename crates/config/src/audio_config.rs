//! Asset loading section

use crate::validation::{ConfigSection, FieldChecks, ValidationError};
use crate::{parse_field, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// File extensions the decoder is built to handle
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp3", "ogg", "wav", "flac", "m4a"];

/// How sound assets are located and how hard loading tries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Attempts per load, the first one included
    pub load_max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub load_retry_delay_ms: u64,

    /// Growth factor between retries; 1.0 keeps the delay fixed
    pub load_backoff_multiplier: f64,

    /// Extension of the files in the assets directory
    pub asset_extension: String,
}

impl AudioConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.load_retry_delay_ms)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            load_max_attempts: 4,
            load_retry_delay_ms: 1000,
            load_backoff_multiplier: 1.0,
            asset_extension: "mp3".to_string(),
        }
    }
}

impl ConfigSection for AudioConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let extension = self.asset_extension.trim_start_matches('.');
        FieldChecks::new(self.section_name())
            .within("load_max_attempts", self.load_max_attempts, 1, 10)
            .within("load_retry_delay_ms", self.load_retry_delay_ms, 0, 60_000)
            .within(
                "load_backoff_multiplier",
                self.load_backoff_multiplier,
                1.0,
                4.0,
            )
            .non_blank("asset_extension", extension)
            .member_of("asset_extension", &extension, &SUPPORTED_EXTENSIONS)
            .finish()
    }

    fn merge(&mut self, other: Self) {
        self.load_max_attempts = other.load_max_attempts;
        self.load_retry_delay_ms = other.load_retry_delay_ms;
        self.load_backoff_multiplier = other.load_backoff_multiplier;
        self.asset_extension = other.asset_extension;
    }

    fn section_name(&self) -> &'static str {
        "audio"
    }

    fn set_field(&mut self, field: &str, value: &str) -> ConfigResult<()> {
        match field {
            "load_max_attempts" => {
                self.load_max_attempts = parse_field("audio.load_max_attempts", value)?
            }
            "load_retry_delay_ms" => {
                self.load_retry_delay_ms = parse_field("audio.load_retry_delay_ms", value)?
            }
            "load_backoff_multiplier" => {
                self.load_backoff_multiplier = parse_field("audio.load_backoff_multiplier", value)?
            }
            "asset_extension" => self.asset_extension = value.trim().to_string(),
            _ => return Err(ConfigError::UnknownKey(format!("audio.{}", field))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        // First load plus three retries
        assert_eq!(config.load_max_attempts, 4);
    }

    #[test]
    fn test_attempt_bounds() {
        let mut config = AudioConfig::default();
        config.load_max_attempts = 0;
        assert!(config.validate().is_err());
        config.load_max_attempts = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multiplier_bounds() {
        let mut config = AudioConfig::default();
        config.load_backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
        config.load_backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());
        config.load_backoff_multiplier = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension() {
        let mut config = AudioConfig::default();
        config.asset_extension = ".wav".to_string();
        assert!(config.validate().is_ok());

        config.asset_extension = "xyz".to_string();
        assert!(config.validate().is_err());

        config.asset_extension = String::new();
        assert!(config.validate().is_err());
    }
}
