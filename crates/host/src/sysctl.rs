// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind sysctl fragments.

use std::path::Path;
use std::time::Duration;

use silo_core::cluster::ClusterId;
use silo_core::error::Result;
use silo_core::kind::DaemonKind;
use tracing::warn;

use crate::exec;
use crate::layout;

/// Settings a kind needs on the host; empty for most kinds.
pub fn settings_for(kind: DaemonKind) -> &'static [&'static str] {
    match kind {
        // OSDs hold many aio contexts and threads.
        DaemonKind::Osd => &["fs.aio-max-nr = 1048576", "kernel.pid_max = 4194304"],
        DaemonKind::Haproxy => &["net.ipv4.ip_forward = 1"],
        DaemonKind::Keepalived => {
            &["net.ipv4.ip_forward = 1", "net.ipv4.ip_nonlocal_bind = 1"]
        }
        _ => &[],
    }
}

pub fn fragment_name(cluster: &ClusterId, kind: DaemonKind) -> String {
    format!("90-{cluster}-{kind}.conf")
}

/// Install the fragment for a kind if it needs one. Returns true when a
/// file was written and a sysctl reload is due.
pub fn install(sysctl_dir: &Path, cluster: &ClusterId, kind: DaemonKind) -> Result<bool> {
    let settings = settings_for(kind);
    if settings.is_empty() {
        return Ok(false);
    }
    layout::makedirs(sysctl_dir, 0o755, None)?;
    let mut content = String::from("# generated by siloadm\n");
    for line in settings {
        content.push_str(line);
        content.push('\n');
    }
    layout::write_file(
        &sysctl_dir.join(fragment_name(cluster, kind)),
        content.as_bytes(),
        0o644,
        None,
    )?;
    Ok(true)
}

/// Remove every fragment belonging to a cluster.
pub fn remove_cluster_fragments(sysctl_dir: &Path, cluster: &ClusterId) -> Result<()> {
    if !sysctl_dir.is_dir() {
        return Ok(());
    }
    let prefix = format!("90-{cluster}-");
    for entry in std::fs::read_dir(sysctl_dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(&prefix) && name.ends_with(".conf") {
                std::fs::remove_file(entry.path())?;
            }
        }
    }
    Ok(())
}

/// Apply all fragments. Failures are logged; a daemon can still start
/// with conservative kernel defaults.
pub async fn reload(timeout: Duration) {
    let argv = vec!["sysctl".to_string(), "--system".to_string()];
    match exec::run(&argv, timeout).await {
        Ok(out) if out.success() => {}
        Ok(out) => warn!(stderr = %out.stderr.trim(), "sysctl reload failed"),
        Err(e) => warn!(error = %e, "sysctl reload failed"),
    }
}

#[cfg(test)]
#[path = "sysctl_tests.rs"]
mod tests;
