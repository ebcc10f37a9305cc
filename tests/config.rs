//! Engine configuration persistence

use std::path::PathBuf;
use visflow::config::{EngineConfig, DEFAULT_FETCH_TIMEOUT_MS};
use visflow::VisFlowError;

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/visflow.toml");

    let mut config = EngineConfig::default();
    config.username = "bob".to_string();
    config.data_dir = PathBuf::from("/srv/datasets");
    config.logging.log_dir = Some(dir.path().join("logs"));
    config.propagation.fetch_timeout_ms = 1_500;
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.fetch_timeout().as_millis(), 1_500);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = EngineConfig::load(dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded.username, "default");
    assert_eq!(loaded.propagation.fetch_timeout_ms, DEFAULT_FETCH_TIMEOUT_MS);
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "username = [unterminated").unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(VisFlowError::Config(_))
    ));
}
