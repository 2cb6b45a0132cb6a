// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn snapshot_carries_every_field_the_manager_reads() {
    let body = snapshot(
        "node1",
        Some(json!([{"name": "mon.a"}])),
        json!({"10.0.0.0/24": {"eth0": ["10.0.0.5"]}}),
        json!({"hostname": "node1"}),
        Some(json!("inventory")),
        42,
        "[client.agent]\n",
        14873,
    );
    for key in ["host", "ls", "networks", "facts", "volume", "ack", "keyring", "port"] {
        assert!(body.get(key).is_some(), "missing {key}");
    }
    assert_eq!(body["host"], "node1");
    assert_eq!(body["ack"], 42);
    assert_eq!(body["port"], 14873);
}

#[test]
fn absent_gatherer_snapshots_serialize_as_null() {
    let body = snapshot("node1", None, json!({}), json!({}), None, 0, "", 14873);
    assert!(body["ls"].is_null());
    assert!(body["volume"].is_null());
}
