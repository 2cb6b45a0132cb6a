// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::deploy::DeployRequest;
use crate::test_helpers::{cluster, current_owner, fixture, Fixture};
use silo_core::config::DeployConfig;

async fn deploy_mon(fx: &Fixture) -> DeployRequest {
    let mut req = DeployRequest::new(cluster(), DaemonId::parse("mon.a").unwrap());
    req.config = DeployConfig::from_json(r#"{"config":"[global]\n","keyring":"[mon.]\n"}"#).unwrap();
    fx.engine.deploy(&req).await.unwrap();
    req
}

#[tokio::test]
async fn removing_an_osd_without_force_is_refused() {
    let fx = fixture();
    let daemon = DaemonId::parse("osd.3").unwrap();
    let err = fx.engine.remove_daemon(&cluster(), &daemon, false, false).await.unwrap_err();
    assert!(matches!(err, Error::DangerousWithoutForce { kind: DaemonKind::Osd }));
}

#[tokio::test]
async fn removing_a_mon_without_force_is_refused() {
    let fx = fixture();
    let daemon = DaemonId::parse("mon.a").unwrap();
    let err = fx.engine.remove_daemon(&cluster(), &daemon, false, false).await.unwrap_err();
    assert!(matches!(err, Error::DangerousWithoutForce { kind: DaemonKind::Mon }));
}

#[tokio::test]
async fn dangerous_kinds_are_backed_up_not_deleted() {
    let fx = fixture();
    let owner = current_owner(&fx);
    let mut req =
        DeployRequest::new(cluster(), DaemonId::parse("prometheus.host1").unwrap());
    req.config =
        DeployConfig::from_json(r#"{"files":{"prometheus.yml":"global: {}\n"}}"#).unwrap();
    req.config.uid = Some(owner.0);
    req.config.gid = Some(owner.1);
    fx.engine.deploy(&req).await.unwrap();

    fx.engine.remove_daemon(&req.cluster, &req.daemon, false, false).await.unwrap();
    let data_dir = fx.engine.ctx.layout.daemon_dir(&req.cluster, &req.daemon);
    assert!(!data_dir.exists());
    let removed = fx.engine.ctx.layout.removed_dir(&req.cluster);
    let backups: Vec<_> = std::fs::read_dir(&removed).unwrap().flatten().collect();
    assert_eq!(backups.len(), 1);
    let name = backups[0].file_name();
    assert!(name.to_str().unwrap().starts_with("prometheus.host1_"));
}

#[tokio::test]
async fn remove_stops_disables_and_removes_both_container_names() {
    let fx = fixture();
    let req = deploy_mon(&fx).await;
    fx.engine.remove_daemon(&req.cluster, &req.daemon, true, true).await.unwrap();

    let unit = "silo-00000000-0000-0000-0000-00000000abcd@mon.a.service";
    let ops = fx.units.ops_for(unit);
    assert!(ops.contains(&"stop".to_string()));
    assert!(ops.contains(&"reset-failed".to_string()));
    assert!(ops.contains(&"disable".to_string()));
    // rm --force for the canonical and the legacy dotted name.
    assert_eq!(fx.fake.calls_containing("rm --force").len(), 2);
}

#[tokio::test]
async fn remove_cluster_clears_all_host_state() {
    let fx = fixture();
    let req = deploy_mon(&fx).await;
    let cluster = req.cluster.clone();

    // Host admin files referencing this cluster.
    std::fs::create_dir_all(&fx.engine.ctx.config_dir).unwrap();
    std::fs::write(
        fx.engine.ctx.admin_config_path(),
        format!("[global]\nfsid = {cluster}\n"),
    )
    .unwrap();
    std::fs::write(fx.engine.ctx.admin_keyring_path(), "[client.admin]\n").unwrap();

    fx.engine.remove_cluster(&cluster, false, false).await.unwrap();

    assert!(!fx.engine.ctx.layout.cluster_dir(&cluster).exists());
    assert!(!fx.engine.ctx.layout.log_dir(&cluster).exists());
    assert!(!fx.engine.ctx.unit_dir.join("silo.target").exists());
    assert!(!fx
        .engine
        .ctx
        .unit_dir
        .join("silo-00000000-0000-0000-0000-00000000abcd.target")
        .exists());
    assert!(!fx.engine.ctx.logrotate_dir.join(cluster.as_str()).exists());
    // Zero clusters remain: admin files and the tool fragment go too.
    assert!(!fx.engine.ctx.admin_config_path().exists());
    assert!(!fx.engine.ctx.admin_keyring_path().exists());
    assert!(!fx.engine.ctx.logrotate_dir.join("siloadm").exists());
}

#[tokio::test]
async fn remove_cluster_keeps_admin_config_for_another_cluster() {
    let fx = fixture();
    let req = deploy_mon(&fx).await;
    let cluster = req.cluster.clone();

    std::fs::create_dir_all(&fx.engine.ctx.config_dir).unwrap();
    // The admin config names a different cluster; a comment mentioning
    // ours must not count.
    std::fs::write(
        fx.engine.ctx.admin_config_path(),
        format!("# was {cluster}\n[global]\nfsid = 11111111-1111-1111-1111-111111111111\n"),
    )
    .unwrap();

    fx.engine.remove_cluster(&cluster, false, false).await.unwrap();
    assert!(fx.engine.ctx.admin_config_path().exists());
}

#[tokio::test]
async fn remove_cluster_can_keep_logs() {
    let fx = fixture();
    let req = deploy_mon(&fx).await;
    fx.engine.remove_cluster(&req.cluster, false, true).await.unwrap();
    assert!(fx.engine.ctx.layout.log_dir(&req.cluster).exists());
}

#[tokio::test]
async fn zap_osds_runs_a_transient_destroyer() {
    let fx = fixture();
    let req = deploy_mon(&fx).await;
    fx.engine.remove_cluster(&req.cluster, true, false).await.unwrap();
    let zaps = fx.fake.calls_containing("lvm zap --destroy");
    assert_eq!(zaps.len(), 1);
    assert!(zaps[0].join(" ").contains("--cluster-fsid 00000000-0000-0000-0000-00000000abcd"));
}
