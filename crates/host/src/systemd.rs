// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Systemd collaborator: unit rendering, installation, and unit operations.
//!
//! Two umbrella targets plus one parameterized service template per
//! cluster. Query operations parse `systemctl` stdout, never its exit
//! status — the tool exits non-zero for informational states.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use silo_core::cluster::ClusterId;
use silo_core::compose::UnitStyle;
use silo_core::error::Result;
use tracing::{debug, warn};

use crate::exec;
use crate::layout;

pub const GLOBAL_TARGET: &str = "silo.target";

pub fn cluster_target_name(cluster: &ClusterId) -> String {
    format!("silo-{cluster}.target")
}

pub fn service_template_name(cluster: &ClusterId) -> String {
    format!("silo-{cluster}@.service")
}

/// Observed unit state, derived from `is-active` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Running,
    Stopped,
    Error,
    Unknown,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Running => "running",
            UnitState::Stopped => "stopped",
            UnitState::Error => "error",
            UnitState::Unknown => "unknown",
        }
    }
}

#[async_trait]
pub trait UnitManager: Send + Sync {
    async fn daemon_reload(&self) -> Result<()>;
    async fn enable(&self, unit: &str) -> Result<()>;
    async fn disable(&self, unit: &str) -> Result<()>;
    async fn start(&self, unit: &str) -> Result<()>;
    async fn stop(&self, unit: &str) -> Result<()>;
    async fn restart(&self, unit: &str) -> Result<()>;
    async fn reset_failed(&self, unit: &str) -> Result<()>;
    /// Text-parsed; informational failures are simply `false`.
    async fn is_enabled(&self, unit: &str) -> bool;
    /// Text-parsed; a missing unit is `Unknown`.
    async fn state(&self, unit: &str) -> UnitState;
}

/// The real collaborator, shelling out to `systemctl`.
#[derive(Debug, Clone)]
pub struct Systemctl {
    pub timeout: Duration,
}

impl Systemctl {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn ctl(&self, args: &[&str]) -> Result<exec::CommandOutput> {
        let argv: Vec<String> =
            std::iter::once("systemctl".to_string()).chain(args.iter().map(|s| s.to_string())).collect();
        exec::run(&argv, self.timeout).await
    }

    async fn ctl_checked(&self, args: &[&str]) -> Result<()> {
        let argv: Vec<String> =
            std::iter::once("systemctl".to_string()).chain(args.iter().map(|s| s.to_string())).collect();
        exec::run_checked(&argv, self.timeout).await.map(|_| ())
    }
}

#[async_trait]
impl UnitManager for Systemctl {
    async fn daemon_reload(&self) -> Result<()> {
        self.ctl_checked(&["daemon-reload"]).await
    }

    async fn enable(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["enable", unit]).await
    }

    async fn disable(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["disable", unit]).await
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["start", unit]).await
    }

    async fn stop(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["stop", unit]).await
    }

    async fn restart(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["restart", unit]).await
    }

    async fn reset_failed(&self, unit: &str) -> Result<()> {
        self.ctl_checked(&["reset-failed", unit]).await
    }

    async fn is_enabled(&self, unit: &str) -> bool {
        match self.ctl(&["is-enabled", unit]).await {
            Ok(out) => out.stdout.trim() == "enabled",
            Err(e) => {
                warn!(unit, error = %e, "is-enabled query failed");
                false
            }
        }
    }

    async fn state(&self, unit: &str) -> UnitState {
        match self.ctl(&["is-active", unit]).await {
            Ok(out) => match out.stdout.trim() {
                "active" | "activating" => UnitState::Running,
                "inactive" => UnitState::Stopped,
                "failed" | "auto-restart" => UnitState::Error,
                _ => UnitState::Unknown,
            },
            Err(e) => {
                warn!(unit, error = %e, "is-active query failed");
                UnitState::Unknown
            }
        }
    }
}

/// Everything the service template needs to render.
#[derive(Debug, Clone)]
pub struct UnitRenderCtx<'a> {
    pub cluster: &'a ClusterId,
    /// `<data-root>/<cluster-id>`.
    pub cluster_data_dir: &'a Path,
    pub runtime_binary: &'a str,
    pub docker_family: bool,
    pub style: &'a UnitStyle,
}

pub fn render_global_target() -> String {
    "\
# generated by siloadm
[Unit]
Description=all Silo clusters on this host
Wants=network-online.target
After=network-online.target

[Install]
WantedBy=multi-user.target
"
    .to_string()
}

pub fn render_cluster_target(cluster: &ClusterId) -> String {
    format!(
        "\
# generated by siloadm
[Unit]
Description=Silo cluster {cluster}
PartOf={global}
Before={global}

[Install]
WantedBy={global}
",
        global = GLOBAL_TARGET,
    )
}

pub fn render_service_template(ctx: &UnitRenderCtx<'_>) -> String {
    let cluster = ctx.cluster;
    let data = ctx.cluster_data_dir.display();
    let target = cluster_target_name(cluster);
    let mut unit = format!(
        "\
# generated by siloadm
[Unit]
Description=Silo %i for cluster {cluster}
After=network-online.target local-fs.target time-sync.target
Wants=network-online.target local-fs.target time-sync.target
"
    );
    if ctx.docker_family {
        unit.push_str("After=docker.service\nRequires=docker.service\n");
    }
    unit.push_str(&format!(
        "\
PartOf={target}
Before={target}

[Service]
LimitNOFILE=1048576
LimitNPROC=1048576
EnvironmentFile=-/etc/environment
ExecStart=/bin/bash {data}/%i/unit.run
ExecStop=-/bin/bash -c '{runtime} stop svc-{cluster}-%i ; bash {data}/%i/unit.stop'
ExecStopPost=-/bin/bash {data}/%i/unit.poststop
KillMode=none
Restart=on-failure
RestartSec=10s
TimeoutStartSec=120
TimeoutStopSec=120
StartLimitInterval=30min
StartLimitBurst=5
",
        runtime = ctx.runtime_binary,
    ));
    if ctx.style.forking {
        unit.push_str("ExecStartPre=-/bin/rm -f %t/%n-pid %t/%n-cid\n");
        unit.push_str("Type=forking\n");
        unit.push_str("PIDFile=%t/%n-pid\n");
        unit.push_str("Delegate=yes\n");
    }
    unit.push_str(&format!(
        "\

[Install]
WantedBy={target}
"
    ));
    unit
}

/// Install or refresh the two targets and the service template for a
/// cluster. Idempotent; callers follow with `daemon-reload`.
pub fn install_base_units(unit_dir: &Path, ctx: &UnitRenderCtx<'_>) -> Result<()> {
    layout::makedirs(unit_dir, 0o755, None)?;
    layout::write_file(
        &unit_dir.join(GLOBAL_TARGET),
        render_global_target().as_bytes(),
        0o644,
        None,
    )?;
    layout::write_file(
        &unit_dir.join(cluster_target_name(ctx.cluster)),
        render_cluster_target(ctx.cluster).as_bytes(),
        0o644,
        None,
    )?;
    layout::write_file(
        &unit_dir.join(service_template_name(ctx.cluster)),
        render_service_template(ctx).as_bytes(),
        0o644,
        None,
    )?;
    Ok(())
}

/// Systemd escapes `-` in instance names when building slice dirs.
fn systemd_escape(s: &str) -> String {
    s.replace('-', "\\x2d")
}

/// Stale slice directory left behind by a failed stop; removing it lets
/// the next start succeed.
pub fn stale_slice_dir(cgroup_root: &Path, cluster: &ClusterId, unit: &str) -> PathBuf {
    cgroup_root
        .join("system.slice")
        .join(format!("system-silo\\x2d{}.slice", systemd_escape(cluster.as_str())))
        .join(unit)
}

/// Remove a stale cgroup slice tree bottom-up. Cgroup directories only
/// answer to rmdir, so files are ignored and failures tolerated.
pub fn trim_stale_cgroup(cgroup_root: &Path, cluster: &ClusterId, unit: &str) {
    let dir = stale_slice_dir(cgroup_root, cluster, unit);
    if !dir.is_dir() {
        return;
    }
    debug!(dir = %dir.display(), "removing stale cgroup slice");
    remove_dirs_bottom_up(&dir);
}

fn remove_dirs_bottom_up(dir: &Path) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                remove_dirs_bottom_up(&path);
            }
        }
    }
    if let Err(e) = std::fs::remove_dir(dir) {
        debug!(dir = %dir.display(), error = %e, "could not remove cgroup dir");
    }
}

#[cfg(test)]
#[path = "systemd_tests.rs"]
mod tests;
