// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cluster_id_accepts_uuid() {
    let id = ClusterId::parse("00000000-0000-0000-0000-00000000abcd").unwrap();
    assert_eq!(id.as_str(), "00000000-0000-0000-0000-00000000abcd");
}

#[test]
fn cluster_id_canonicalizes_case() {
    let id = ClusterId::parse("00000000-0000-0000-0000-00000000ABCD").unwrap();
    assert_eq!(id.as_str(), "00000000-0000-0000-0000-00000000abcd");
}

#[test]
fn cluster_id_rejects_garbage() {
    assert!(ClusterId::parse("not-a-uuid").is_err());
    assert!(ClusterId::parse("").is_err());
}

#[test]
fn generated_cluster_ids_are_unique_and_valid() {
    let a = ClusterId::generate();
    let b = ClusterId::generate();
    assert_ne!(a, b);
    assert!(ClusterId::parse(a.as_str()).is_ok());
}

#[test]
fn daemon_id_round_trips() {
    let id = DaemonId::parse("mon.a").unwrap();
    assert_eq!(id.kind, DaemonKind::Mon);
    assert_eq!(id.id, "a");
    assert_eq!(id.to_string(), "mon.a");
}

#[test]
fn daemon_id_instance_may_contain_dots() {
    let id = DaemonId::parse("mon.host.example.com").unwrap();
    assert_eq!(id.kind, DaemonKind::Mon);
    assert_eq!(id.id, "host.example.com");
}

#[test]
fn daemon_id_rejects_missing_parts() {
    assert!(DaemonId::parse("mon").is_err());
    assert!(DaemonId::parse("mon.").is_err());
    assert!(DaemonId::parse("").is_err());
}

#[test]
fn daemon_id_rejects_unknown_kind() {
    let err = DaemonId::parse("toaster.a").unwrap_err();
    assert!(matches!(err, Error::UnknownKind(k) if k == "toaster"));
}

#[test]
fn daemon_id_serde_uses_text_form() {
    let id = DaemonId::new(DaemonKind::Osd, "3");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"osd.3\"");
    let back: DaemonId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
