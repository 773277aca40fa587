//! Settings parser for <data_dir>/config.toml

use super::types::Settings;
use std::path::{Path, PathBuf};
use whereabouts_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "whereabouts";

/// Default data directory: `~/.local/share/whereabouts` (platform equivalent).
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path of the settings file inside a data directory
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILENAME)
}

/// Load settings from <data_dir>/config.toml
///
/// A missing, unreadable or invalid file yields defaults (with a warning).
/// An invalid `[location]` section falls back to the default policy.
pub fn load_settings(data_dir: &Path) -> Settings {
    let path = config_path(data_dir);

    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Settings::default();
    }

    let mut settings: Settings = match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                return Settings::default();
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            return Settings::default();
        }
    };

    if let Err(e) = settings.location.policy().validate() {
        warn!("Ignoring [location] in {:?}: {}", path, e);
        settings.location = Default::default();
    }

    settings
}

/// Save settings to <data_dir>/config.toml
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    ensure_dir(data_dir)?;

    let path = config_path(data_dir);
    let temp_path = data_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    let full_content = format!("{}{}", generate_config_header(), content);

    std::fs::write(&temp_path, &full_content)
        .with_context(|| format!("Failed to write {:?}", temp_path))?;

    std::fs::rename(&temp_path, &path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    info!("Saved settings to {:?}", path);
    Ok(())
}

/// Create the data directory and a commented default config.toml
///
/// Existing files are left untouched. Returns the config path.
pub fn init_data_dir(data_dir: &Path) -> Result<PathBuf> {
    ensure_dir(data_dir)?;

    let path = config_path(data_dir);
    if !path.exists() {
        std::fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("Created default config at {:?}", path);
    }

    Ok(path)
}

fn ensure_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {:?}", data_dir))?;
    }
    Ok(())
}

fn generate_config_header() -> String {
    r#"# Whereabouts Configuration
# Generated by whereabouts

"#
    .to_string()
}

const DEFAULT_CONFIG: &str = r#"# Whereabouts Configuration

[location]
interval_secs = 60            # Desired interval between fixes (inexact)
fastest_interval_secs = 30    # Never deliver fixes faster than this
max_wait_secs = 120           # Maximum batching delay
priority = "high_accuracy"    # high_accuracy | balanced_power_accuracy | low_power | no_power

[notification]
id = 12345678
channel_id = "while_in_use_channel_01"
title = "Whereabouts"
placeholder_text = "no fix yet"
open_app_label = "Open app"
stop_tracking_label = "Stop tracking"

[behavior]
unsubscribe_timeout_ms = 5000  # Give up waiting for the platform after this
config_change_grace_ms = 0     # 0 = wait for the consumer to re-attach
stop_on_shutdown = true
resume_on_start = false

[simulator]
start_latitude = 37.4220
start_longitude = -122.0841
step_degrees = 0.0005
tick_ms = 1000                 # 0 = follow location.interval_secs
permission = "granted"         # granted | denied
fail_unsubscribe = false
unsubscribe_delay_ms = 50
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SimulatedPermission;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_invalid_toml_uses_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(config_path(dir.path()), "not [valid toml").unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_invalid_policy_falls_back_to_default_location() {
        let dir = tempdir().unwrap();
        std::fs::write(
            config_path(dir.path()),
            "[location]\ninterval_secs = 10\nfastest_interval_secs = 20\n\n[behavior]\nresume_on_start = true\n",
        )
        .unwrap();

        let settings = load_settings(dir.path());
        assert_eq!(settings.location.interval_secs, 60);
        assert!(settings.behavior.resume_on_start);
    }

    #[test]
    fn test_init_writes_parseable_default_config() {
        let dir = tempdir().unwrap();
        let path = init_data_dir(dir.path()).unwrap();
        assert!(path.exists());

        let settings = load_settings(dir.path());
        assert_eq!(settings.simulator.tick_ms, 1000);
        assert_eq!(settings.simulator.permission, SimulatedPermission::Granted);
        assert_eq!(settings.location, Settings::default().location);
        assert_eq!(settings.notification, Settings::default().notification);
    }

    #[test]
    fn test_init_preserves_existing_config() {
        let dir = tempdir().unwrap();
        std::fs::write(config_path(dir.path()), "[behavior]\nstop_on_shutdown = false\n").unwrap();

        init_data_dir(dir.path()).unwrap();
        assert!(!load_settings(dir.path()).behavior.stop_on_shutdown);
    }

    #[test]
    fn test_init_into_unwritable_location_reports_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = init_data_dir(&blocker.join("data")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested");

        let mut settings = Settings::default();
        settings.notification.title = "Tracker".to_string();
        settings.behavior.config_change_grace_ms = 750;
        save_settings(&data_dir, &settings).unwrap();

        let loaded = load_settings(&data_dir);
        assert_eq!(loaded, settings);
        assert!(!data_dir.join(".config.toml.tmp").exists());
    }
}
