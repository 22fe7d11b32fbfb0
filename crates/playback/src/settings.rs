//! Persisted session preferences

use crate::session::SessionSettings;
use bedtime_config::ConfigManager;
use std::sync::Mutex;

/// Where session preferences are kept between runs
///
/// Stores never fail from the caller's point of view; a store that cannot
/// read hands back defaults and a store that cannot write logs and moves on.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> SessionSettings;
    fn save(&self, settings: &SessionSettings);
}

/// Keeps preferences for the lifetime of the process
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: Mutex<SessionSettings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self) -> SessionSettings {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, settings: &SessionSettings) {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = *settings;
    }
}

/// Reads and writes the `[session]` section of the config file
#[derive(Debug)]
pub struct ConfigSettingsStore {
    manager: ConfigManager,
}

impl ConfigSettingsStore {
    pub fn new(manager: ConfigManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

impl SettingsStore for ConfigSettingsStore {
    fn load(&self) -> SessionSettings {
        let session = self.manager.session();
        SessionSettings {
            include_music: session.include_music,
            include_ambient_sounds: session.include_ambient_sounds,
            volume: session.volume,
            auto_progress: session.auto_progress,
        }
    }

    fn save(&self, settings: &SessionSettings) {
        let result = self.manager.update_session(|session| {
            session.include_music = settings.include_music;
            session.include_ambient_sounds = settings.include_ambient_sounds;
            session.volume = settings.volume;
            session.auto_progress = settings.auto_progress;
        });
        if let Err(e) = result {
            log::warn!("Failed to persist session settings: {}", e);
        }
    }
}
