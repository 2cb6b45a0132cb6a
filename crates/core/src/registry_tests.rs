// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn every_kind_has_a_descriptor() {
    for kind in DaemonKind::ALL {
        assert_eq!(descriptor(*kind).kind, *kind);
    }
}

#[test]
fn storage_kinds_require_config_and_keyring() {
    for kind in DaemonKind::ALL.iter().filter(|k| k.is_storage()) {
        let desc = descriptor(*kind);
        assert!(desc.required_files.contains(&"config"), "{kind}");
        assert!(desc.required_files.contains(&"keyring"), "{kind}");
    }
}

#[test]
fn monitoring_kinds_carry_fixed_ownership() {
    for kind in DaemonKind::ALL.iter().filter(|k| k.is_monitoring()) {
        assert!(descriptor(*kind).fixed_uid_gid.is_some(), "{kind}");
    }
}

#[test]
fn validate_reports_all_missing_pieces_at_once() {
    let config = DeployConfig::default();
    let err = validate(DaemonKind::Alertmanager, &config).unwrap_err();
    let Error::InvalidConfig { which } = err else {
        panic!("expected InvalidConfig, got {err:?}")
    };
    assert!(which.contains("alertmanager.yml"), "{which}");
    assert!(which.contains("peers"), "{which}");
}

#[test]
fn validate_passes_with_everything_present() {
    let config = DeployConfig::from_json(
        r#"{"files":{"alertmanager.yml":"route: {}\n"},"peers":["host1:9094"]}"#,
    )
    .unwrap();
    validate(DaemonKind::Alertmanager, &config).unwrap();
}

#[test]
fn custom_container_requires_an_image() {
    let err = validate(DaemonKind::Container, &DeployConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { which } if which.contains("image")));
}

#[test]
fn node_exporter_validates_empty_config() {
    validate(DaemonKind::NodeExporter, &DeployConfig::default()).unwrap();
}

#[test]
fn storage_args_name_the_daemon_and_run_foreground() {
    let args = extra_daemon_args(DaemonKind::Mon, "a", &DeployConfig::default());
    assert!(args.windows(2).any(|w| w == ["-n", "mon.a"]));
    assert!(args.contains(&"-f".to_string()));
}

#[test]
fn alertmanager_args_expand_peers() {
    let config =
        DeployConfig::from_json(r#"{"peers":["host1:9094","host2:9094"]}"#).unwrap();
    let args = extra_daemon_args(DaemonKind::Alertmanager, "a", &config);
    assert!(args.contains(&"--cluster.peer=host1:9094".to_string()));
    assert!(args.contains(&"--cluster.peer=host2:9094".to_string()));
}

#[test]
fn snmp_args_come_from_the_config() {
    let config = DeployConfig::from_json(
        r#"{"destination":"192.168.1.10:162","snmp_version":"V2c"}"#,
    )
    .unwrap();
    let args = extra_daemon_args(DaemonKind::SnmpGateway, "a", &config);
    assert!(args.contains(&"--snmp.destination=192.168.1.10:162".to_string()));
    assert!(args.contains(&"--snmp.version=V2c".to_string()));
}

#[test]
fn free_form_args_are_appended_last() {
    let config = DeployConfig::from_json(r#"{"args":["--debug-ms=1"]}"#).unwrap();
    let args = extra_daemon_args(DaemonKind::Osd, "0", &config);
    assert_eq!(args.last().map(String::as_str), Some("--debug-ms=1"));
}
