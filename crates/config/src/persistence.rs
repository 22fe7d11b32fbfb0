//! Reading and writing `config.toml`
//!
//! Saves go through a temporary file in the same directory followed by a
//! rename, and the previous file is copied to `config.toml.backup` first.

use crate::error::{summarize, FileAction};
use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const DEFAULT_HEADER: &str = "\
# Bedtime player configuration
#
# [session] holds the defaults for new stories; volume is 0.0 - 1.0.
# [audio] controls how sound files are found and how often loads are retried.
# Environment variables BEDTIME_<SECTION>_<FIELD> override these values.

";

#[derive(Debug, Clone)]
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn backup_path(&self) -> PathBuf {
        self.config_path.with_extension("toml.backup")
    }

    /// Reads the config file
    ///
    /// A missing file yields defaults. An empty file or malformed TOML is an
    /// error. Out-of-range values load with a warning so they can be fixed
    /// with `config set` instead of being thrown away.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::io(FileAction::Read, &self.config_path, e))?;
        if contents.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.config_path.clone(),
            });
        }

        let mut config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;
        upgrade_version(&mut config);

        if let Err(errors) = config.validate() {
            log::warn!("Config has invalid values: {}", summarize(&errors));
        }
        Ok(config)
    }

    /// Validates and writes `config`, keeping a backup of the old file
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;

        let body = toml::to_string_pretty(config)?;
        if self.config_path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.config_path, &backup)
                .map_err(|e| ConfigError::io(FileAction::Backup, &self.config_path, e))?;
            log::debug!("Backed up config to {}", backup.display());
        }
        self.replace_contents(&body)?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Writes the default config with an explanatory header
    pub fn generate_default_with_comments(&self) -> ConfigResult<()> {
        let body = toml::to_string_pretty(&Config::default())?;
        self.replace_contents(&format!("{DEFAULT_HEADER}{body}"))?;

        log::info!("Generated default config at {}", self.config_path.display());
        Ok(())
    }

    fn replace_contents(&self, content: &str) -> ConfigResult<()> {
        let dir = self.config_path.parent().ok_or_else(|| {
            ConfigError::NoConfigDir(format!(
                "{} has no parent directory",
                self.config_path.display()
            ))
        })?;
        create_dir(dir)?;

        let write_err = |e| ConfigError::io(FileAction::Write, &self.config_path, e);
        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&self.config_path)
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

fn create_dir(dir: &Path) -> ConfigResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(FileAction::CreateDirectory, dir, e))?;
        log::info!("Created config directory {}", dir.display());
    }
    Ok(())
}

/// Older files are upgraded in memory; missing keys take their defaults
fn upgrade_version(config: &mut Config) {
    if config.version > CONFIG_VERSION {
        log::warn!(
            "Config version {} is newer than {}; unknown keys are ignored",
            config.version,
            CONFIG_VERSION
        );
    } else if config.version < CONFIG_VERSION {
        log::info!(
            "Upgrading config from version {} to {}",
            config.version,
            CONFIG_VERSION
        );
        config.version = CONFIG_VERSION;
    }
}
