// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{cluster, fixture, Fixture};
use silo_host::systemd::UnitState;

/// Lay down a legacy package-manager mon at `<data-root>/mon/silo-a`.
fn plant_legacy_mon(fx: &Fixture) -> std::path::PathBuf {
    let legacy = fx.engine.ctx.layout.data_root.join("mon").join("silo-a");
    std::fs::create_dir_all(legacy.join("store.db")).unwrap();
    std::fs::write(legacy.join("fsid"), format!("{}\n", cluster())).unwrap();
    std::fs::write(legacy.join("keyring"), "[mon.]\n\tkey = AAAA\n").unwrap();
    std::fs::write(legacy.join("store.db").join("000005.ldb"), "lvl").unwrap();
    std::fs::create_dir_all(&fx.engine.ctx.config_dir).unwrap();
    std::fs::write(
        fx.engine.ctx.admin_config_path(),
        format!("[global]\nfsid = {}\n", cluster()),
    )
    .unwrap();
    legacy
}

#[tokio::test]
async fn adopt_moves_data_and_renames_leveldb_files() {
    let fx = fixture();
    let legacy = plant_legacy_mon(&fx);
    let daemon = DaemonId::parse("mon.a").unwrap();
    fx.units
        .set_state("silo-mon@a.service", UnitState::Running);

    let req = AdoptRequest { daemon: daemon.clone(), cluster: None, force_start: false };
    fx.engine.adopt(&req).await.unwrap();

    assert!(!legacy.exists(), "legacy dir must be gone after the move");
    let new_dir = fx.engine.ctx.layout.daemon_dir(&cluster(), &daemon);
    assert!(new_dir.join("keyring").is_file());
    assert!(new_dir.join("store.db").join("000005.sst").is_file());
    assert!(!new_dir.join("store.db").join("000005.ldb").exists());
    assert!(new_dir.join(silo_host::layout::UNIT_RUN).is_file());

    // The legacy unit was running, so the new unit starts.
    let unit = "silo-00000000-0000-0000-0000-00000000abcd@mon.a.service";
    assert!(fx.units.ops_for(unit).contains(&"start".to_string()));
    let legacy_ops = fx.units.ops_for("silo-mon@a.service");
    assert!(legacy_ops.contains(&"stop".to_string()));
    assert!(legacy_ops.contains(&"disable".to_string()));
}

#[tokio::test]
async fn adopting_a_stopped_daemon_enables_without_starting() {
    let fx = fixture();
    plant_legacy_mon(&fx);
    let daemon = DaemonId::parse("mon.a").unwrap();
    fx.units.set_state("silo-mon@a.service", UnitState::Stopped);

    let req = AdoptRequest { daemon, cluster: None, force_start: false };
    fx.engine.adopt(&req).await.unwrap();

    let unit = "silo-00000000-0000-0000-0000-00000000abcd@mon.a.service";
    let ops = fx.units.ops_for(unit);
    assert!(ops.contains(&"enable".to_string()));
    assert!(!ops.contains(&"start".to_string()));
}

#[tokio::test]
async fn force_start_overrides_a_stopped_legacy_unit() {
    let fx = fixture();
    plant_legacy_mon(&fx);
    let daemon = DaemonId::parse("mon.a").unwrap();
    let req = AdoptRequest { daemon, cluster: None, force_start: true };
    fx.engine.adopt(&req).await.unwrap();
    let unit = "silo-00000000-0000-0000-0000-00000000abcd@mon.a.service";
    assert!(fx.units.ops_for(unit).contains(&"start".to_string()));
}

#[tokio::test]
async fn adopt_twice_fails_cleanly_the_second_time() {
    let fx = fixture();
    plant_legacy_mon(&fx);
    let daemon = DaemonId::parse("mon.a").unwrap();
    let req = AdoptRequest { daemon, cluster: None, force_start: false };
    fx.engine.adopt(&req).await.unwrap();
    let err = fx.engine.adopt(&req).await.unwrap_err();
    assert!(matches!(err, Error::MissingData));
}

#[tokio::test]
async fn unsupported_kinds_are_rejected() {
    let fx = fixture();
    let daemon = DaemonId::parse("iscsi.gw1").unwrap();
    let req = AdoptRequest { daemon, cluster: None, force_start: false };
    let err = fx.engine.adopt(&req).await.unwrap_err();
    assert!(matches!(err, Error::AdoptUnsupported { kind: DaemonKind::Iscsi }));
}

#[tokio::test]
async fn osd_sidecar_json_is_quarantined() {
    let fx = fixture();
    let legacy = fx.engine.ctx.layout.data_root.join("osd").join("silo-0");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(legacy.join("fsid"), format!("{}\n", cluster())).unwrap();
    std::fs::write(legacy.join("osd_fsid"), "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa\n").unwrap();
    std::fs::write(legacy.join("keyring"), "[osd.0]\n").unwrap();
    std::fs::write(
        legacy.join("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa.json"),
        r#"{"cluster_fsid":"00000000-0000-0000-0000-00000000abcd"}"#,
    )
    .unwrap();
    std::fs::create_dir_all(&fx.engine.ctx.config_dir).unwrap();

    let daemon = DaemonId::parse("osd.0").unwrap();
    let req = AdoptRequest { daemon: daemon.clone(), cluster: None, force_start: false };
    fx.engine.adopt(&req).await.unwrap();

    let new_dir = fx.engine.ctx.layout.daemon_dir(&cluster(), &daemon);
    assert!(new_dir
        .join("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa.json.adopted-by-siloadm")
        .is_file());
    assert!(!new_dir.join("aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa.json").exists());
}
