//! Tests for config module

use std::path::{Path, PathBuf};

use autoposter::config::Config;
use autoposter::error::ErrorCategory;
use autoposter::prelude::PosterErrorTrait;
use tempfile::TempDir;

#[test]
fn test_example_config_parses() {
    let config = Config::from_file(Path::new("config.example.toml"))
        .expect("config.example.toml should parse");

    assert!(config.validate().is_ok());
    assert_eq!(config.publishing.posts_per_day, 3);
    assert_eq!(config.publishing.publish_window, (8, 20));
    assert_eq!(config.system.circuit_breaker_timeout, 1800);
    assert_eq!(config.paths.health_file, PathBuf::from("autoposter.health"));
    assert_eq!(config.telegram.chat_id, "@example_channel");
    assert!(config.wordpress.password.is_empty());
}

#[test]
fn test_load_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [publishing]
        publish_window = [18, 9]
        "#,
    )
    .unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(err.to_string().contains("publish_window"));
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[publishing\nposts_per_day = ").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(!err.is_recoverable());
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Config::from_file(Path::new("/nonexistent/autoposter.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_load_rejects_window_ending_at_midnight() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [publishing]
        publish_window = [8, 24]
        "#,
    )
    .unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(err.to_string().contains("publish_window end (24)"));
}
