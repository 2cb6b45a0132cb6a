// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering of the per-daemon `unit.run`/`unit.stop`/`unit.poststop`
//! shell scripts. The scripts are self-contained: restarting a daemon
//! needs only these files, never the registry.

use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::{one_shot_cmd, ComposedRun, RuntimeInfo};

/// Quote one argv element for bash. Plain tokens pass through to keep
/// the scripts readable.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Render an argv as one shell line.
pub fn shell_line(argv: &[String]) -> String {
    argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ")
}

/// `unit.run`: optional pre-rendered preamble lines, then the daemon
/// container. Forking styles background via the runtime's detach mode,
/// so exec is correct for both.
pub fn render_run(
    cluster: &ClusterId,
    daemon: &DaemonId,
    preamble: &[String],
    run: &ComposedRun,
) -> String {
    let mut script = format!("#!/bin/bash\n# {daemon} for cluster {cluster}\nset -e\n");
    for line in preamble {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str("exec ");
    script.push_str(&shell_line(&run.argv));
    script.push('\n');
    script
}

/// `unit.stop`: stop both remembered container names, tolerating absence.
pub fn render_stop(stop_cmds: &[Vec<String>]) -> String {
    let mut script = String::from("#!/bin/bash\n");
    for cmd in stop_cmds {
        script.push_str("! ");
        script.push_str(&shell_line(cmd));
        script.push_str(" 2> /dev/null\n");
    }
    script
}

/// `unit.poststop`: cleanup commands after the unit fully stopped.
pub fn render_poststop(cmds: &[Vec<String>]) -> String {
    let mut script = String::from("#!/bin/bash\n");
    for cmd in cmds {
        script.push_str("! ");
        script.push_str(&shell_line(cmd));
        script.push_str(" 2> /dev/null\n");
    }
    script
}

/// OSD preamble: activate the logical volumes before the daemon starts.
pub fn osd_activate_cmd(
    runtime: &RuntimeInfo,
    image: &str,
    osd_id: &str,
    osd_fsid: &str,
    volumes: &[String],
    envs: &[String],
) -> Vec<String> {
    let args = vec![
        "lvm".to_string(),
        "activate".to_string(),
        osd_id.to_string(),
        osd_fsid.to_string(),
        "--no-systemd".to_string(),
    ];
    one_shot_cmd(runtime, image, Some("/usr/bin/silo-volume"), &args, volumes, envs)
}

/// OSD poststop: release the logical volumes.
pub fn osd_deactivate_cmd(
    runtime: &RuntimeInfo,
    image: &str,
    osd_id: &str,
    volumes: &[String],
    envs: &[String],
) -> Vec<String> {
    let args = vec!["lvm".to_string(), "deactivate".to_string(), osd_id.to_string()];
    one_shot_cmd(runtime, image, Some("/usr/bin/silo-volume"), &args, volumes, envs)
}

/// iSCSI needs configfs mounted on the host side before rbd-target-api
/// starts, and a TCMU runner container beside it.
pub fn iscsi_configfs_mount_cmd(data_dir: &str) -> Vec<String> {
    vec![
        "mount".to_string(),
        "-t".to_string(),
        "configfs".to_string(),
        "none".to_string(),
        format!("{data_dir}/configfs"),
    ]
}

pub fn iscsi_configfs_umount_cmd(data_dir: &str) -> Vec<String> {
    vec!["umount".to_string(), format!("{data_dir}/configfs")]
}

/// The agent never runs in a container: its unit re-executes this binary.
pub fn agent_run(binary: &str, cluster: &ClusterId, daemon: &DaemonId) -> String {
    format!(
        "#!/bin/bash\n# {daemon} for cluster {cluster}\nexec {binary} agent --fsid {cluster} --daemon-id {id}\n",
        binary = shell_quote(binary),
        id = shell_quote(&daemon.id),
    )
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
