//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Layering of defaults, YAML file and environment
//! - Template generation
//! - Validation of the loaded settings

use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use unstall::models::ConfigError;
use unstall::{ConfigManager, ServiceKind, Settings};

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_dir)
}

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn test_file_only_config() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let path = config_dir.join("unstall.yaml");
    fs::write(
        &path,
        r#"
deluge_url: http://deluge:8112
deluge_password: secret
radarr_enabled: true
radarr_url: http://radarr:7878
radarr_api_key: abc123
radarr_search_on_delete: true
only_labels: [movies]
stall_duration: 30m
refresh_duration: 90
run_on_startup: false
"#,
    )
    .unwrap();

    let settings = ConfigManager::new(Some(path)).load_with_env(env(&[])).unwrap();

    assert_eq!(settings.deluge_url, "http://deluge:8112");
    assert_eq!(settings.deluge_password, "secret");
    assert_eq!(settings.stall_duration, Duration::from_secs(30 * 60));
    assert_eq!(settings.refresh_duration, Duration::from_secs(90));
    assert!(!settings.run_on_startup);
    assert_eq!(settings.only_labels, vec!["movies"]);

    let radarr = settings.service(ServiceKind::Radarr);
    assert!(radarr.enabled);
    assert!(radarr.search_on_delete);
    assert_eq!(radarr.api_key, "abc123");

    // Untouched keys keep their defaults
    assert!(!settings.sonarr_enabled);
    assert_eq!(settings.sonarr_url, "http://localhost:8989");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_env_only_config() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let path = config_dir.join("empty.yaml");
    fs::write(&path, "{}\n").unwrap();

    let settings = ConfigManager::new(Some(path))
        .load_with_env(env(&[
            ("SONARR_ENABLED", "true"),
            ("SONARR_API_KEY", "key"),
            ("SONARR_SEARCH_ON_DELETE", "true"),
            ("STALL_DURATION", "1h30m"),
            ("ONLY_LABELS", ""),
            ("DEBUG", "true"),
        ]))
        .unwrap();

    assert!(settings.sonarr_enabled);
    assert!(settings.sonarr_search_on_delete);
    assert_eq!(settings.stall_duration, Duration::from_secs(5400));
    assert!(settings.only_labels.is_empty());
    assert!(settings.debug);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_enabled_service_without_key_fails_validation() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let path = config_dir.join("unstall.yaml");
    fs::write(&path, "sonarr_enabled: true\n").unwrap();

    let settings = ConfigManager::new(Some(path)).load_with_env(env(&[])).unwrap();

    assert_eq!(
        settings.validate(),
        Err(ConfigError::MissingServiceSetting(ServiceKind::Sonarr, "api_key"))
    );
}

#[test]
fn test_invalid_yaml_is_error() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let path = config_dir.join("unstall.yaml");
    fs::write(&path, "stall_duration: [not, a, duration\n").unwrap();

    assert!(ConfigManager::new(Some(path)).load_with_env(env(&[])).is_err());
}

#[test]
fn test_written_template_loads_as_defaults() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let path = config_dir.join("conf/unstall.yaml");

    ConfigManager::write_template(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("stall_duration: 1h"));
    assert!(contents.contains("refresh_duration: 10m"));

    let settings = ConfigManager::new(Some(path)).load_with_env(env(&[])).unwrap();
    assert_eq!(settings, Settings::default());
}
