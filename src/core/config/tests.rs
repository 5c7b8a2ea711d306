use super::data::Config;
use super::defaults::{SettingsOverrides, DEFAULT_BACKEND_URL, DEFAULT_MODEL};
use super::io::ConfigError;
use crate::core::frame_decoder::Dialect;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        endpoint: Some("https://api.example.com/v1".to_string()),
        dialect: Some(Dialect::EventStream),
        fallback_enabled: Some(true),
        stall_timeout_secs: Some(12),
        ..Default::default()
    };
    config.save_to_path(&config_path).expect("save failed");

    let contents = fs::read_to_string(&config_path).expect("read failed");
    assert!(contents.contains("dialect = \"event-stream\""));

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded, config);

    Config::mutate_at(&config_path, |config| {
        config.dialect = None;
        config.model = Some("qwen2.5".to_string());
        Ok(())
    })
    .expect("mutate failed");

    let reloaded = Config::load_from_path(&config_path).expect("reload failed");
    assert_eq!(reloaded.dialect, None);
    assert_eq!(reloaded.model.as_deref(), Some("qwen2.5"));
    assert_eq!(reloaded.stall_timeout_secs, Some(12));
}

#[test]
fn test_invalid_toml_is_a_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "endpoint = [unterminated").expect("write failed");

    let err = Config::load_from_path(&config_path).expect_err("parse should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn test_unknown_dialect_value_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "dialect = \"carrier-pigeon\"\n").expect("write failed");

    assert!(matches!(
        Config::load_from_path(&config_path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_defaults_resolve_to_local_ndjson() {
    let settings = Config::default().resolve_settings(&SettingsOverrides::default());

    assert_eq!(settings.endpoint, "http://localhost:11434");
    assert_eq!(settings.model, DEFAULT_MODEL);
    assert_eq!(settings.dialect, Dialect::Ndjson);
    assert_eq!(settings.backend_url, DEFAULT_BACKEND_URL);
    assert_eq!(settings.stall_timeout, Duration::from_secs(30));
    assert!(!settings.fallback_enabled);
    assert_eq!(settings.fallback_timeout, Duration::from_secs(20));
}

#[test]
fn test_dialect_inference_and_overrides() {
    let config = Config {
        endpoint: Some("https://api.example.com/v1".to_string()),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_settings(&SettingsOverrides::default()).dialect,
        Dialect::EventStream
    );

    // An endpoint override re-runs inference.
    let local = config.resolve_settings(&SettingsOverrides {
        endpoint: Some("http://127.0.0.1:11434".to_string()),
        ..Default::default()
    });
    assert_eq!(local.dialect, Dialect::Ndjson);

    // The configured dialect beats inference; the flag beats both.
    let pinned = Config {
        dialect: Some(Dialect::Ndjson),
        ..config.clone()
    };
    assert_eq!(
        pinned.resolve_settings(&SettingsOverrides::default()).dialect,
        Dialect::Ndjson
    );
    let flagged = pinned.resolve_settings(&SettingsOverrides {
        dialect: Some(Dialect::EventStream),
        model: Some("gpt-4o-mini".to_string()),
        ..Default::default()
    });
    assert_eq!(flagged.dialect, Dialect::EventStream);
    assert_eq!(flagged.model, "gpt-4o-mini");
}

#[test]
fn test_zero_stall_timeout_is_preserved() {
    let config = Config {
        stall_timeout_secs: Some(0),
        ..Default::default()
    };
    assert!(config.stall_timeout().is_zero());
}
