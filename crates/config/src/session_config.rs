//! Session defaults section

use crate::validation::{ConfigSection, FieldChecks, ValidationError};
use crate::{parse_field, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Defaults applied when a new story is set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Play background music
    pub include_music: bool,

    /// Play the page's ambient sounds
    pub include_ambient_sounds: bool,

    /// Shared channel volume (0.0 - 1.0)
    pub volume: f32,

    /// Turn pages automatically when their time runs out
    pub auto_progress: bool,

    /// Story length used when none is requested (minutes)
    pub default_duration_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            include_music: true,
            include_ambient_sounds: true,
            volume: 0.7,
            auto_progress: true,
            default_duration_minutes: 15,
        }
    }
}

impl ConfigSection for SessionConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        FieldChecks::new(self.section_name())
            .within("volume", self.volume, 0.0, 1.0)
            .within(
                "default_duration_minutes",
                self.default_duration_minutes,
                1,
                180,
            )
            .finish()
    }

    fn merge(&mut self, other: Self) {
        self.include_music = other.include_music;
        self.include_ambient_sounds = other.include_ambient_sounds;
        self.volume = other.volume;
        self.auto_progress = other.auto_progress;
        self.default_duration_minutes = other.default_duration_minutes;
    }

    fn section_name(&self) -> &'static str {
        "session"
    }

    fn set_field(&mut self, field: &str, value: &str) -> ConfigResult<()> {
        match field {
            "include_music" => self.include_music = parse_field("session.include_music", value)?,
            "include_ambient_sounds" => {
                self.include_ambient_sounds = parse_field("session.include_ambient_sounds", value)?
            }
            "volume" => self.volume = parse_field("session.volume", value)?,
            "auto_progress" => self.auto_progress = parse_field("session.auto_progress", value)?,
            "default_duration_minutes" => {
                self.default_duration_minutes =
                    parse_field("session.default_duration_minutes", value)?
            }
            _ => return Err(ConfigError::UnknownKey(format!("session.{}", field))),
        }
        Ok(())
    }
}
