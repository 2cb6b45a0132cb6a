// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::deploy::DeployRequest;
use crate::test_helpers::{cluster, fixture};
use silo_core::config::DeployConfig;
use silo_host::systemd::UnitState;
use yare::parameterized;

#[parameterized(
    kib = { "512KiB", 512 * 1024 },
    mib = { "100MiB", 100 * 1024 * 1024 },
    gib_fraction = { "1.5GiB", (1.5 * 1024.0 * 1024.0 * 1024.0) as u64 },
    plain_bytes = { "4096B", 4096 },
    decimal_mb = { "250MB", 250 * 1000 * 1000 },
)]
fn mem_usage_parses(input: &str, expected: u64) {
    assert_eq!(parse_mem_usage(input), Some(expected));
}

#[test]
fn mem_usage_rejects_garbage() {
    assert_eq!(parse_mem_usage("--"), None);
    assert_eq!(parse_mem_usage(""), None);
    assert_eq!(parse_mem_usage("12XB"), None);
}

#[tokio::test]
async fn listing_enumerates_managed_and_legacy_daemons() {
    let fx = fixture();
    let mut req = DeployRequest::new(cluster(), DaemonId::parse("mon.a").unwrap());
    req.config = DeployConfig::from_json(r#"{"config":"x","keyring":"y"}"#).unwrap();
    fx.engine.deploy(&req).await.unwrap();

    // A not-yet-adopted package-manager daemon.
    std::fs::create_dir_all(fx.engine.ctx.layout.data_root.join("mds").join("silo-x"))
        .unwrap();

    let container = "svc-00000000-0000-0000-0000-00000000abcd-mon-a";
    fx.fake.respond_ok("ps -a", &format!("{container} abc123 quay.io/silo/silo:v17\n"));
    fx.fake.respond_ok("stats --no-stream", &format!("{container} 512MiB\n"));

    let entries = fx.engine.list_daemons().await.unwrap();
    assert_eq!(entries.len(), 2);

    let managed = entries.iter().find(|e| e.style == "managed").unwrap();
    assert_eq!(managed.name, "mon.a");
    assert_eq!(managed.cluster.as_deref(), Some("00000000-0000-0000-0000-00000000abcd"));
    assert!(managed.enabled);
    assert_eq!(managed.state, "running");
    assert_eq!(managed.container_id.as_deref(), Some("abc123"));
    assert_eq!(managed.memory_usage, Some(512 * 1024 * 1024));
    assert!(managed.created.is_some());
    assert!(managed.configured.is_some());

    let legacy = entries.iter().find(|e| e.style == "legacy").unwrap();
    assert_eq!(legacy.name, "mds.x");
    assert_eq!(legacy.cluster, None);
}

#[tokio::test]
async fn listing_is_the_union_of_daemon_dirs_present() {
    let fx = fixture();
    let layout = &fx.engine.ctx.layout;
    for name in ["mon.a", "osd.1", "mgr.x"] {
        std::fs::create_dir_all(layout.cluster_dir(&cluster()).join(name)).unwrap();
    }
    let entries = fx.engine.list_daemons().await.unwrap();
    let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["mgr.x", "mon.a", "osd.1"]);
}

#[tokio::test]
async fn quick_status_merges_ps_and_stats() {
    let fx = fixture();
    let mut req = DeployRequest::new(cluster(), DaemonId::parse("mon.a").unwrap());
    req.config = DeployConfig::from_json(r#"{"config":"x","keyring":"y"}"#).unwrap();
    fx.engine.deploy(&req).await.unwrap();
    let unit = "silo-00000000-0000-0000-0000-00000000abcd@mon.a.service";
    fx.units.set_state(unit, UnitState::Running);

    let container = "svc-00000000-0000-0000-0000-00000000abcd-mon-a";
    fx.fake.respond_ok("ps -a", &format!("{container} abc123 img\n"));
    fx.fake.respond_ok("stats --no-stream", &format!("{container} 1GiB\n"));

    let map = fx.engine.quick_status(&cluster()).await.unwrap();
    let status = &map["mon.a"];
    assert!(status.enabled);
    assert_eq!(status.state, "running");
    assert_eq!(status.container_id.as_deref(), Some("abc123"));
    assert_eq!(status.memory_usage, Some(1024 * 1024 * 1024));
}
