//! Integration tests for the configuration system

use bedtime_config::{Config, ConfigError, ConfigManager, LogLevel, CONFIG_VERSION};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    assert!(manager.initialize()?);
    assert!(!manager.initialize()?);

    manager.update(|config| {
        config.session.volume = 0.4;
        config.session.include_ambient_sounds = false;
        config.audio.load_max_attempts = 5;
        config.app.log_level = LogLevel::Debug;
    })?;

    let loaded = manager.load()?;
    assert_eq!(loaded.version, CONFIG_VERSION);
    assert_eq!(loaded.session.volume, 0.4);
    assert!(!loaded.session.include_ambient_sounds);
    assert_eq!(loaded.audio.load_max_attempts, 5);
    assert_eq!(loaded.app.log_level, LogLevel::Debug);

    manager.reset()?;
    assert_eq!(manager.load()?, Config::default());
    Ok(())
}

#[test]
fn test_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.app.assets_dir = PathBuf::from("/srv/bedtime/sounds");
    config.audio.asset_extension = "ogg".to_string();

    let toml_string = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(config, deserialized);
    Ok(())
}

#[test]
fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    std::fs::write(
        manager.config_path(),
        "[session]\nauto_progress = false\n",
    )?;

    let loaded = manager.load()?;
    assert!(!loaded.session.auto_progress);
    assert_eq!(loaded.session.volume, 0.7);
    assert_eq!(loaded.audio.load_retry_delay_ms, 1000);
    Ok(())
}

#[test]
fn test_invalid_update_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| config.session.default_duration_minutes = 0);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    assert_eq!(manager.load()?.session.default_duration_minutes, 15);
    Ok(())
}

#[test]
fn test_set_value_then_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = manager.load()?;
    config.set_value("audio.load_retry_delay_ms", "250")?;
    config.set_value("session.default_duration_minutes", "30")?;
    manager.save(&config)?;

    let loaded = manager.load()?;
    assert_eq!(loaded.audio.load_retry_delay_ms, 250);
    assert_eq!(loaded.session.default_duration_minutes, 30);
    Ok(())
}

#[test]
fn test_validate_reports_every_problem() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    std::fs::write(
        manager.config_path(),
        "[session]\nvolume = 3.0\n[audio]\nload_max_attempts = 0\nasset_extension = \"txt\"\n",
    )?;

    let errors = manager.validate()?;
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e.contains("session.volume")));
    assert!(errors.iter().any(|e| e.contains("audio.load_max_attempts")));
    assert!(errors.iter().any(|e| e.contains("audio.asset_extension")));
    Ok(())
}
