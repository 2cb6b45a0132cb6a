// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy preflight specs: errors that must fire before any host state
//! is touched.

use crate::prelude::*;

#[test]
fn reconfig_without_prior_deploy_is_a_clean_error() {
    let host = Host::new();
    host.siloadm(&["deploy", "--reconfig", "--name", "mgr.x", "--fsid", FSID])
        .fails(1)
        .stderr_has("ERROR:")
        .stderr_has("data directory does not exist");
    // No side effects: the cluster dir was never created.
    assert!(!host.path().join("data").join(FSID).exists());
}

#[test]
fn malformed_fsid_is_rejected() {
    Host::new()
        .siloadm(&["deploy", "--name", "mon.a", "--fsid", "not-a-uuid"])
        .fails(1)
        .stderr_has("not a valid cluster id");
}

#[test]
fn unknown_daemon_kind_is_rejected() {
    Host::new()
        .siloadm(&["deploy", "--name", "widget.a", "--fsid", FSID])
        .fails(1)
        .stderr_has("unknown daemon kind");
}

#[test]
fn missing_required_files_are_all_reported() {
    Host::new()
        .siloadm(&["deploy", "--name", "alertmanager.a", "--fsid", FSID])
        .fails(1)
        .stderr_has("alertmanager.yml")
        .stderr_has("peers");
}

#[test]
fn bad_config_json_is_rejected() {
    Host::new()
        .siloadm(&["deploy", "--name", "mon.a", "--fsid", FSID, "--config-json", "{broken"])
        .fails(1)
        .stderr_has("ERROR:");
}
