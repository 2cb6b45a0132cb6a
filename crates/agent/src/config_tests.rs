// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn loads_a_full_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{"target_ip":"10.0.0.9","target_port":7150,"refresh_period":20,
            "listener_port":14873,"host":"node1","device_enhanced_scan":true}"#,
    )
    .unwrap();
    let config = AgentConfig::load(dir.path()).unwrap();
    assert_eq!(config.target_ip, "10.0.0.9");
    assert_eq!(config.target_port, 7150);
    assert_eq!(config.refresh_period, 20);
    assert_eq!(config.listener_port, 14873);
    assert_eq!(config.host, "node1");
    assert!(config.device_enhanced_scan);
    assert_eq!(config.target_url(), "https://10.0.0.9:7150/data");
}

#[test]
fn optional_fields_have_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{"target_ip":"10.0.0.9","target_port":7150,"host":"node1"}"#,
    )
    .unwrap();
    let config = AgentConfig::load(dir.path()).unwrap();
    assert!(!config.device_enhanced_scan);
    assert_eq!(config.listener_port, DEFAULT_LISTENER_PORT);
    assert_eq!(config.refresh_period, 20);
}

#[test]
fn missing_file_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let err = AgentConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn malformed_json_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();
    let err = AgentConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}
