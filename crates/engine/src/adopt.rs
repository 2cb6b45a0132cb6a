// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adoption of package-manager daemons into the container-managed layout.
//!
//! Data is moved, never copied; running adopt twice therefore fails the
//! second time because the legacy dir is gone.

use std::path::{Path, PathBuf};

use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose;
use silo_core::config::DeployConfig;
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use silo_core::registry;
use silo_host::layout::{self, FILE_MODE};
use silo_host::lock::{ClusterLock, LockWait};
use silo_host::systemd::UnitState;
use tracing::{info, warn};

use crate::conf;
use crate::context::Engine;
use crate::deploy::{declared_ports, DeployRequest, LOCK_TIMEOUT};

/// One `adopt` invocation.
#[derive(Debug, Clone)]
pub struct AdoptRequest {
    pub daemon: DaemonId,
    /// Discovered from the legacy data when absent.
    pub cluster: Option<ClusterId>,
    /// Start the new unit even when the legacy unit was stopped.
    pub force_start: bool,
}

impl Engine {
    pub async fn adopt(&self, req: &AdoptRequest) -> Result<()> {
        let kind = req.daemon.kind;
        if !kind.is_adoptable() {
            return Err(Error::AdoptUnsupported { kind });
        }
        let legacy_dir = self.legacy_data_dir(&req.daemon);
        if !legacy_dir.is_dir() {
            return Err(Error::MissingData);
        }

        let cluster = match &req.cluster {
            Some(cluster) => cluster.clone(),
            None => self.discover_cluster_id(&req.daemon, &legacy_dir).await?,
        };
        info!(daemon = %req.daemon, cluster = %cluster, "adopting");

        let mut lock = ClusterLock::new(&self.ctx.lock_dir, &cluster);
        lock.acquire(LockWait::For(LOCK_TIMEOUT)).await?;
        let result = self.adopt_locked(req, &cluster, &legacy_dir).await;
        lock.release();
        result
    }

    /// `<data-root>/<kind>/silo-<id>`, the package-manager layout.
    pub(crate) fn legacy_data_dir(&self, daemon: &DaemonId) -> PathBuf {
        self.ctx
            .layout
            .data_root
            .join(daemon.kind.as_str())
            .join(format!("silo-{}", daemon.id))
    }

    fn legacy_unit_name(&self, daemon: &DaemonId) -> String {
        format!("silo-{}@{}.service", daemon.kind, daemon.id)
    }

    /// Cluster-id discovery: the online `fsid` file, then (for OSDs) the
    /// LVM tag scan, then the legacy sidecar JSON, then the host config.
    async fn discover_cluster_id(
        &self,
        daemon: &DaemonId,
        legacy_dir: &Path,
    ) -> Result<ClusterId> {
        let fsid_file = legacy_dir.join("fsid");
        if let Ok(content) = std::fs::read_to_string(&fsid_file) {
            if let Ok(cluster) = ClusterId::parse(content.trim()) {
                return Ok(cluster);
            }
        }
        if daemon.kind == DaemonKind::Osd {
            if let Some(cluster) = self.osd_fsid_from_lvm(daemon).await {
                return Ok(cluster);
            }
            if let Some(cluster) = osd_fsid_from_sidecar(legacy_dir) {
                return Ok(cluster);
            }
        }
        if let Ok(content) = std::fs::read_to_string(self.ctx.admin_config_path()) {
            if let Some(fsid) = conf::parse_value(&content, "fsid") {
                return Ok(ClusterId::parse(&fsid)?);
            }
        }
        Err(Error::InvalidArgs(format!(
            "unable to discover the cluster id for {daemon}; pass --fsid"
        )))
    }

    /// Offline LVM tag scan through a transient silo-volume container.
    async fn osd_fsid_from_lvm(&self, daemon: &DaemonId) -> Option<ClusterId> {
        let args = vec![
            "lvm".to_string(),
            "list".to_string(),
            daemon.id.clone(),
            "--format".to_string(),
            "json".to_string(),
        ];
        let volumes = vec!["/dev:/dev".to_string(), "/run/udev:/run/udev".to_string()];
        let argv = compose::one_shot_cmd(
            &self.ctx.runtime,
            &self.ctx.image,
            Some("/usr/bin/silo-volume"),
            &args,
            &volumes,
            &[],
        );
        let out = silo_host::engine::call_checked(
            self.services.engine.as_ref(),
            &argv,
            self.ctx.timeout,
        )
        .await
        .ok()?;
        let value: serde_json::Value = serde_json::from_str(&out.stdout).ok()?;
        let fsid = value
            .as_object()?
            .values()
            .flat_map(|v| v.as_array().into_iter().flatten())
            .filter_map(|lv| lv.get("tags"))
            .filter_map(|tags| tags.get("silo.cluster_fsid"))
            .filter_map(|v| v.as_str())
            .next()?;
        ClusterId::parse(fsid).ok()
    }

    async fn adopt_locked(
        &self,
        req: &AdoptRequest,
        cluster: &ClusterId,
        legacy_dir: &Path,
    ) -> Result<()> {
        let daemon = &req.daemon;
        let legacy_unit = self.legacy_unit_name(daemon);
        let was_running =
            self.services.units.state(&legacy_unit).await == UnitState::Running;

        if let Err(e) = self.services.units.stop(&legacy_unit).await {
            warn!(unit = %legacy_unit, error = %e, "legacy stop failed");
        }
        if let Err(e) = self.services.units.disable(&legacy_unit).await {
            warn!(unit = %legacy_unit, error = %e, "legacy disable failed");
        }

        // Move, not copy. The legacy dir may be a bind-mounted tmpfs.
        let image = if self.ctx.image.is_empty() {
            registry::descriptor(daemon.kind).default_image.to_string()
        } else {
            self.ctx.image.clone()
        };
        let owner = self.resolve_owner(daemon.kind, &DeployConfig::default(), &image).await?;
        let new_dir = self.ctx.layout.make_daemon_dirs(cluster, daemon, Some(owner))?;
        move_dir_contents(legacy_dir, &new_dir)?;
        unmount_if_mountpoint(legacy_dir, self.ctx.timeout).await;
        std::fs::remove_dir(legacy_dir).ok();

        layout::recursive_chown(&new_dir, owner.0, owner.1)?;
        match daemon.kind {
            DaemonKind::Mon => rename_leveldb_files(&new_dir.join("store.db"))?,
            DaemonKind::Osd => normalize_osd_dir(&new_dir, owner)?,
            _ => {}
        }

        // The cluster config rides along; logs move to the new log dir.
        if let Ok(content) = std::fs::read_to_string(self.ctx.admin_config_path()) {
            layout::write_file(&new_dir.join("config"), content.as_bytes(), FILE_MODE, Some(owner))?;
        }
        self.move_legacy_logs(cluster, daemon)?;

        // Units through the normal deploy path; start only if the legacy
        // unit ran (or the caller forces it).
        let mut files = std::collections::BTreeMap::new();
        for name in registry::descriptor(daemon.kind).required_files {
            let path = new_dir.join(name);
            if let Ok(content) = std::fs::read_to_string(&path) {
                files.insert(name.to_string(), content);
            }
        }
        let mut deploy = DeployRequest::new(cluster.clone(), daemon.clone());
        deploy.config.files = files;
        if daemon.kind == DaemonKind::Osd {
            deploy.osd_fsid = std::fs::read_to_string(new_dir.join("osd_fsid"))
                .ok()
                .map(|s| s.trim().to_string());
        }

        let composed = self.compose_daemon(&deploy, &image);
        let run = composed.run_cmd();
        self.write_unit_scripts(&deploy, &new_dir, &image, owner, &composed, &run)?;
        let unit = compose::service_name(cluster, daemon);
        if was_running || req.force_start {
            self.install_and_start(cluster, daemon, &run.style, false, daemon.kind).await?;
        } else {
            self.install_and_enable_only(cluster, daemon, &run.style).await?;
        }

        let ports = declared_ports(daemon.kind, &deploy.config);
        if !ports.is_empty() {
            self.services.firewall.open_ports(&ports).await;
            self.services.firewall.apply().await;
        }
        layout::touch(&new_dir.join(layout::UNIT_CONFIGURED), Some(owner))?;
        info!(daemon = %daemon, unit = %unit, "adopted");
        Ok(())
    }

    fn move_legacy_logs(&self, cluster: &ClusterId, daemon: &DaemonId) -> Result<()> {
        let log_root = &self.ctx.layout.log_root;
        let new_log_dir = self.ctx.layout.log_dir(cluster);
        if !log_root.is_dir() {
            return Ok(());
        }
        let prefix = format!("silo-{}.{}.log", daemon.kind, daemon.id);
        for entry in std::fs::read_dir(log_root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) {
                std::fs::rename(entry.path(), new_log_dir.join(name))?;
            }
        }
        Ok(())
    }
}

fn move_dir_contents(from: &Path, to: &Path) -> Result<()> {
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        std::fs::rename(entry.path(), &dest)?;
    }
    Ok(())
}

async fn unmount_if_mountpoint(dir: &Path, timeout: std::time::Duration) {
    let is_mountpoint = std::fs::read_to_string("/proc/mounts")
        .map(|mounts| {
            let needle = format!(" {} ", dir.display());
            mounts.lines().any(|l| l.contains(&needle))
        })
        .unwrap_or(false);
    if !is_mountpoint {
        return;
    }
    let argv = vec!["umount".to_string(), dir.display().to_string()];
    if let Err(e) = silo_host::exec::run(&argv, timeout).await {
        warn!(dir = %dir.display(), error = %e, "umount failed");
    }
}

/// Legacy "simple" scan sidecar JSON carries the cluster fsid.
fn osd_fsid_from_sidecar(dir: &Path) -> Option<ClusterId> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(".json") {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else { continue };
        if let Some(fsid) = value.get("cluster_fsid").and_then(|v| v.as_str()) {
            if let Ok(cluster) = ClusterId::parse(fsid) {
                return Some(cluster);
            }
        }
    }
    None
}

/// Monitors once used leveldb; the embedded store reads `.sst` names.
fn rename_leveldb_files(store_dir: &Path) -> Result<()> {
    if !store_dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(store_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(stem) = name.strip_suffix(".ldb") {
            std::fs::rename(entry.path(), store_dir.join(format!("{stem}.sst")))?;
        }
    }
    Ok(())
}

/// OSD dirs carry block-device links and possibly a legacy "simple"
/// sidecar JSON that must not be scanned again.
fn normalize_osd_dir(dir: &Path, owner: (u32, u32)) -> Result<()> {
    for link in ["block", "block.db", "block.wal"] {
        let path = dir.join(link);
        if !path.exists() {
            continue;
        }
        if let Ok(target) = std::fs::read_link(&path) {
            if target.exists() {
                layout::recursive_chown(&target, owner.0, owner.1)?;
            }
        }
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.ends_with(".json") && !name.ends_with(".adopted-by-siloadm") {
            let renamed = dir.join(format!("{name}.adopted-by-siloadm"));
            std::fs::rename(entry.path(), renamed)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "adopt_tests.rs"]
mod tests;
