// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Loading configuration files

use ocr_overlay::config::{AppConfig, ConfigError, ModelKind};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_full_config_file() {
    let file = write_config(
        r#"
[server]
host = "0.0.0.0"
port = 9000
max_upload_bytes = 2048

[backend]
endpoint = "http://kraken:8600"
timeout_secs = 30

[pipeline]
model_cache_capacity = 2
max_concurrent_requests = 4

[[models.segmentation]]
name = "blla.mlmodel"
path = "/srv/models/blla.mlmodel"

[[models.recognition]]
name = "catmus.mlmodel"
path = "/srv/models/catmus.mlmodel"

[[models.recognition]]
name = "arabic.mlmodel"
path = "/srv/models/arabic.mlmodel"
"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.server.listen_addr(), "0.0.0.0:9000");
    assert_eq!(config.server.max_upload_bytes, 2048);
    assert_eq!(config.backend.endpoint, "http://kraken:8600");
    assert_eq!(config.backend.timeout().as_secs(), 30);
    assert_eq!(config.pipeline.model_cache_capacity, 2);
    assert_eq!(config.pipeline.baseline_width, 2);
    assert_eq!(config.models.list_segmentation_models(), vec!["blla.mlmodel"]);
    assert_eq!(
        config.models.list_recognition_models(),
        vec!["catmus.mlmodel", "arabic.mlmodel"]
    );
    assert_eq!(
        config.models.resolve("arabic.mlmodel", ModelKind::Recognition).unwrap(),
        "/srv/models/arabic.mlmodel"
    );
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[[models.recognition]]
display_name = "only.mlmodel"
artifact_path = "models/only.mlmodel"
"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 8501);
    assert_eq!(config.backend.endpoint, "http://127.0.0.1:8600");
    // segmentation table untouched
    assert_eq!(config.models.list_segmentation_models().len(), 2);
    assert_eq!(config.models.list_recognition_models(), vec!["only.mlmodel"]);
}

#[test]
fn test_empty_file_is_defaults() {
    let file = write_config("");
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_duplicate_model_names_rejected() {
    let file = write_config(
        r#"
[[models.segmentation]]
name = "a"
path = "models/a"

[[models.segmentation]]
name = "a"
path = "models/b"
"#,
    );

    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert!(err.to_string().contains("duplicate model name 'a'"));
}

#[test]
fn test_malformed_toml() {
    let file = write_config("[server\nport = ");
    assert!(matches!(
        AppConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("overlay.toml");
    let err = AppConfig::from_file(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("overlay.toml"));
}

#[test]
fn test_overrides_apply_after_file() {
    let file = write_config("[server]\nport = 9000\n");
    let mut config = AppConfig::from_file(file.path()).unwrap();

    config
        .apply_overrides(|key| match key {
            "OVERLAY_PORT" => Some("9100".to_string()),
            "OVERLAY_MAX_CONCURRENT" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.pipeline.max_concurrent_requests, 3);
}
