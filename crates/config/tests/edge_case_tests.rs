//! Edge case and error scenario tests

use bedtime_config::{Config, ConfigManager};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "this is not valid TOML {{{")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;

    assert!(manager.config_path().exists());
    Ok(())
}

#[test]
fn test_session_update_survives_unknown_keys() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(
        manager.config_path(),
        "[session]\nvolume = 0.4\nsleep_timer = true\n[audio]\nasset_extension = \"ogg\"\n",
    )?;

    manager.update_session(|session| session.include_music = false)?;

    let config = manager.load()?;
    assert!(!config.session.include_music);
    assert_eq!(config.session.volume, 0.4);
    assert_eq!(config.audio.asset_extension, "ogg");
    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.session.volume = 1.0;
    config.session.default_duration_minutes = 180;
    config.audio.load_max_attempts = 10;
    config.audio.load_retry_delay_ms = 60_000;
    config.audio.load_backoff_multiplier = 4.0;
    assert!(config.validate().is_ok());

    config.session.volume = 0.0;
    config.session.default_duration_minutes = 1;
    config.audio.load_max_attempts = 1;
    config.audio.load_retry_delay_ms = 0;
    config.audio.load_backoff_multiplier = 1.0;
    assert!(config.validate().is_ok());

    config.audio.load_retry_delay_ms = 60_001;
    assert!(config.validate().is_err());
}

#[test]
fn test_special_characters_in_assets_dir() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.app.assets_dir = PathBuf::from("/path/with spaces/сны/夢");
    assert!(config.validate().is_ok());

    let toml = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml)?;
    assert_eq!(deserialized.app.assets_dir, config.app.assets_dir);
    Ok(())
}

#[test]
#[cfg(unix)]
fn test_readonly_config_dir() -> Result<(), Box<dyn std::error::Error>> {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let mut perms = fs::metadata(temp_dir.path())?.permissions();
    perms.set_mode(0o555);
    fs::set_permissions(temp_dir.path(), perms)?;

    // Root ignores directory permissions; nothing to assert there
    let result = manager.save(&Config::default());
    let is_root = fs::write(temp_dir.path().join("probe"), b"x").is_ok();
    if !is_root {
        assert!(result.is_err());
    }
    assert!(manager.load().is_ok());

    let mut perms = fs::metadata(temp_dir.path())?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(temp_dir.path(), perms)?;
    Ok(())
}

#[test]
fn test_rapid_session_updates() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    for step in 0..=20 {
        manager.update_session(|session| {
            session.volume = step as f32 / 20.0;
            session.auto_progress = step % 2 == 0;
        })?;
    }

    let session = manager.session();
    assert_eq!(session.volume, 1.0);
    assert!(session.auto_progress);
    Ok(())
}

#[test]
fn test_merge_with_defaults() {
    let mut base = Config::default();
    base.session.volume = 0.9;
    base.merge(Config::default());

    assert_eq!(base.session.volume, 0.7);
}

#[test]
fn test_config_file_deleted_during_operation() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;
    fs::remove_file(manager.config_path())?;

    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "")?;

    assert!(manager.load().is_err());
    assert_eq!(manager.load_or_default(), Config::default());
    Ok(())
}

#[test]
fn test_unknown_sections_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(
        manager.config_path(),
        "version = 1\n[player]\ndefault_volume = 80\n[session]\nvolume = 0.5\n",
    )?;

    let config = manager.load()?;
    assert_eq!(config.session.volume, 0.5);
    Ok(())
}

#[test]
fn test_backup_preserved_on_failed_save() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.session.volume = 0.75;
    manager.save(&config)?;
    manager.save(&config)?;

    config.session.volume = 2.0;
    assert!(manager.save(&config).is_err());

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.session.volume, 0.75);
    assert_eq!(manager.load()?.session.volume, 0.75);
    Ok(())
}
