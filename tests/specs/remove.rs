// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Removal guard specs.

use crate::prelude::*;

#[test]
fn removing_an_object_store_daemon_without_force_is_refused() {
    Host::new()
        .siloadm(&["rm-daemon", "--name", "osd.0", "--fsid", FSID])
        .fails(1)
        .stderr_has("requires --force");
}

#[test]
fn removing_a_monitor_without_force_is_refused() {
    Host::new()
        .siloadm(&["rm-daemon", "--name", "mon.a", "--fsid", FSID])
        .fails(1)
        .stderr_has("requires --force");
}

#[test]
fn rm_cluster_demands_force() {
    Host::new().siloadm(&["rm-cluster", "--fsid", FSID]).fails(1).stderr_has("--force");
}

#[test]
fn zap_osds_demands_force() {
    Host::new().siloadm(&["zap-osds", "--fsid", FSID]).fails(1).stderr_has("--force");
}
