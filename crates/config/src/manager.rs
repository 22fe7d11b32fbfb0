//! Entry point for reading and writing the config file

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult, SessionConfig};
use directories::ProjectDirs;
use std::path::PathBuf;

const FILE_NAME: &str = "config.toml";

/// Owns the location of `config.toml` and every access to it
#[derive(Debug, Clone)]
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses the platform config directory
    ///
    /// - Linux: `~/.config/bedtime/`
    /// - macOS: `~/Library/Application Support/bedtime/`
    /// - Windows: `%APPDATA%\bedtime\`
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "bedtime").ok_or_else(|| {
            ConfigError::NoConfigDir("the user config directory is unknown".to_string())
        })?;
        Self::with_directory(dirs.config_dir().to_path_buf())
    }

    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        Ok(Self {
            persistence: ConfigPersistence::new(config_dir.join(FILE_NAME)),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(FILE_NAME)
    }

    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Like [`load`](Self::load), but a broken file is logged and replaced by
    /// defaults
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            log::warn!("{e}; using default config");
            Config::default()
        })
    }

    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Load, modify, validate, save
    ///
    /// ```rust,no_run
    /// # use bedtime_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| config.session.volume = 0.5)?;
    /// # Ok::<(), bedtime_config::ConfigError>(())
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// The `[session]` defaults a new story starts with
    pub fn session(&self) -> SessionConfig {
        self.load_or_default().session
    }

    /// Rewrites `[session]`, keeping the other sections as they are on disk
    ///
    /// An unreadable file does not block the write; it is replaced by
    /// defaults plus the new session values.
    pub fn update_session<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut SessionConfig),
    {
        let mut config = self.load_or_default();
        update_fn(&mut config.session);
        self.save(&config)
    }

    /// Writes a commented default file unless one exists; true when written
    pub fn initialize(&self) -> ConfigResult<bool> {
        let path = self.config_path();
        if path.exists() {
            log::info!("Config already exists at {}", path.display());
            return Ok(false);
        }
        self.persistence.generate_default_with_comments()?;
        Ok(true)
    }

    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Every failed check in the file on disk, rendered for display
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let errors = self.load()?.validate().err().unwrap_or_default();
        Ok(errors.iter().map(ToString::to_string).collect())
    }

    /// [`load`](Self::load) followed by the `BEDTIME_*` variables in
    /// [`ENV_OVERRIDES`]; unparseable values are logged and skipped
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config is invalid after environment overrides: {}",
                crate::error::summarize(&errors)
            );
        }
        Ok(config)
    }
}

/// Environment variables consulted by [`ConfigManager::load_with_env_overrides`]
pub const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("BEDTIME_SESSION_VOLUME", "session.volume"),
    ("BEDTIME_SESSION_INCLUDE_MUSIC", "session.include_music"),
    ("BEDTIME_SESSION_INCLUDE_AMBIENT_SOUNDS", "session.include_ambient_sounds"),
    ("BEDTIME_SESSION_AUTO_PROGRESS", "session.auto_progress"),
    ("BEDTIME_APP_ASSETS_DIR", "app.assets_dir"),
];

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in ENV_OVERRIDES {
        let Some(value) = lookup(var) else {
            continue;
        };
        match config.set_value(key, &value) {
            Ok(()) => log::info!("{} overridden by {}", key, var),
            Err(e) => log::warn!("Ignoring {}: {}", var, e),
        }
    }
}
