// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::{Composer, RuntimeInfo, RuntimeKind};

fn cluster() -> ClusterId {
    ClusterId::parse("00000000-0000-0000-0000-00000000abcd").unwrap()
}

#[test]
fn quote_passes_plain_tokens_through() {
    assert_eq!(shell_quote("--rm"), "--rm");
    assert_eq!(shell_quote("/usr/bin/podman"), "/usr/bin/podman");
    assert_eq!(shell_quote("a:b:z"), "a:b:z");
}

#[test]
fn quote_wraps_specials_in_single_quotes() {
    assert_eq!(shell_quote("a b"), "'a b'");
    assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    assert_eq!(shell_quote(""), "''");
}

#[test]
fn quote_escapes_embedded_single_quotes() {
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
}

#[test]
fn run_script_execs_the_composed_command() {
    let cluster = cluster();
    let daemon = DaemonId::parse("mon.a").unwrap();
    let runtime = RuntimeInfo::new(RuntimeKind::Docker, "/usr/bin/docker");
    let composer = Composer::new(&runtime, &cluster, &daemon, "img:v17");
    let run = composer.run_cmd();
    let script = render_run(&cluster, &daemon, &[], &run);
    assert!(script.starts_with("#!/bin/bash\n"));
    assert!(script.contains("set -e"));
    assert!(script.contains("exec /usr/bin/docker run --rm"));
    assert!(script.trim_end().ends_with("img:v17"));
}

#[test]
fn run_script_places_preamble_before_exec() {
    let cluster = cluster();
    let daemon = DaemonId::parse("osd.0").unwrap();
    let runtime = RuntimeInfo::new(RuntimeKind::Docker, "/usr/bin/docker");
    let composer = Composer::new(&runtime, &cluster, &daemon, "img");
    let run = composer.run_cmd();
    let preamble = vec!["echo activating".to_string()];
    let script = render_run(&cluster, &daemon, &preamble, &run);
    let activate_pos = script.find("echo activating").unwrap();
    let exec_pos = script.find("exec ").unwrap();
    assert!(activate_pos < exec_pos);
}

#[test]
fn stop_script_tolerates_missing_containers() {
    let cluster = cluster();
    let daemon = DaemonId::parse("mon.a").unwrap();
    let runtime = RuntimeInfo::new(RuntimeKind::Docker, "/usr/bin/docker");
    let composer = Composer::new(&runtime, &cluster, &daemon, "img");
    let script = render_stop(&composer.stop_cmds());
    for line in script.lines().skip(1) {
        assert!(line.starts_with("! "), "{line}");
        assert!(line.ends_with("2> /dev/null"), "{line}");
    }
    assert!(script.contains("stop svc-00000000-0000-0000-0000-00000000abcd-mon-a"));
    assert!(script.contains("stop svc-00000000-0000-0000-0000-00000000abcd-mon.a"));
}

#[test]
fn osd_activate_goes_through_silo_volume() {
    let runtime = RuntimeInfo::new(RuntimeKind::Docker, "/usr/bin/docker");
    let argv = osd_activate_cmd(&runtime, "img", "0", "aaaa-bbbb", &[], &[]);
    let line = argv.join(" ");
    assert!(line.contains("--entrypoint /usr/bin/silo-volume"));
    assert!(line.contains("lvm activate 0 aaaa-bbbb --no-systemd"));
    assert!(line.contains("--rm"));
}

#[test]
fn agent_script_reexecutes_this_binary() {
    let cluster = cluster();
    let daemon = DaemonId::parse("agent.host1").unwrap();
    let script = agent_run("/usr/sbin/siloadm", &cluster, &daemon);
    assert!(script.contains(
        "exec /usr/sbin/siloadm agent --fsid 00000000-0000-0000-0000-00000000abcd"
    ));
    assert!(script.contains("--daemon-id host1"));
}
