// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logrotate fragments: one per cluster, one for the tool itself.

use std::path::Path;

use silo_core::cluster::ClusterId;
use silo_core::error::Result;

use crate::layout;

pub const TOOL_FRAGMENT: &str = "siloadm";

pub fn render_cluster_fragment(cluster: &ClusterId, log_root: &Path) -> String {
    format!(
        "\
# generated by siloadm
{root}/{cluster}/*.log {{
    rotate 7
    daily
    compress
    sharedscripts
    postrotate
        killall -q -1 silo-mon silo-mgr silo-mds silo-osd silo-rgw || pkill -1 -x 'silo-mon|silo-mgr|silo-mds|silo-osd|silo-rgw' || true
    endscript
    missingok
    notifempty
    su root root
}}
",
        root = log_root.display(),
    )
}

pub fn render_tool_fragment(log_root: &Path) -> String {
    format!(
        "\
# generated by siloadm
{root}/siloadm.log {{
    rotate 7
    daily
    compress
    missingok
    notifempty
    su root root
}}
",
        root = log_root.display(),
    )
}

pub fn install_cluster(logrotate_dir: &Path, cluster: &ClusterId, log_root: &Path) -> Result<()> {
    layout::makedirs(logrotate_dir, 0o755, None)?;
    layout::write_file(
        &logrotate_dir.join(cluster.as_str()),
        render_cluster_fragment(cluster, log_root).as_bytes(),
        0o644,
        None,
    )
}

pub fn install_tool(logrotate_dir: &Path, log_root: &Path) -> Result<()> {
    layout::makedirs(logrotate_dir, 0o755, None)?;
    layout::write_file(
        &logrotate_dir.join(TOOL_FRAGMENT),
        render_tool_fragment(log_root).as_bytes(),
        0o644,
        None,
    )
}

pub fn remove_cluster(logrotate_dir: &Path, cluster: &ClusterId) -> Result<()> {
    let path = logrotate_dir.join(cluster.as_str());
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

pub fn remove_tool(logrotate_dir: &Path) -> Result<()> {
    let path = logrotate_dir.join(TOOL_FRAGMENT);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
