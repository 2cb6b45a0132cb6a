// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Surface-level CLI specs: help, version, JSON inventories.

use crate::prelude::*;

#[test]
fn help_shows_usage_and_core_subcommands() {
    Host::new()
        .siloadm(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("bootstrap")
        .stdout_has("deploy")
        .stdout_has("rm-daemon")
        .stdout_has("agent");
}

#[test]
fn version_prints_the_build() {
    Host::new().siloadm(&["version"]).passes().stdout_has("siloadm");
}

#[test]
fn ls_on_an_empty_host_is_an_empty_json_list() {
    let result = Host::new().siloadm(&["ls"]).passes();
    assert_eq!(result.stdout_json(), serde_json::json!([]));
}

#[test]
fn gather_facts_reports_a_hostname() {
    let result = Host::new().siloadm(&["gather-facts"]).passes();
    let facts = result.stdout_json();
    assert!(facts["hostname"].is_string());
    assert!(facts["cpu_count"].is_number());
}

#[test]
fn add_repo_is_refused_on_container_hosts() {
    Host::new().siloadm(&["add-repo"]).fails(1).stderr_has("ERROR:");
}
