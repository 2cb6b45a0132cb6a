// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon and cluster removal.
//!
//! Dangerous kinds are backed up under `removed/` instead of deleted;
//! monitor and object-store removal demands an explicit `--force`.

use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::{self, Composer};
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use silo_host::layout::{self, Layout};
use silo_host::lock::{ClusterLock, LockWait};
use silo_host::systemd::{self, GLOBAL_TARGET};
use silo_host::{logrotate, sysctl};
use tracing::{info, warn};

use crate::conf;
use crate::context::Engine;
use crate::deploy::LOCK_TIMEOUT;

impl Engine {
    /// Stop, disable and remove one daemon. Dangerous kinds keep a
    /// backup of their data dir unless `force_delete_data`.
    pub async fn remove_daemon(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        force: bool,
        force_delete_data: bool,
    ) -> Result<()> {
        let mut lock = ClusterLock::new(&self.ctx.lock_dir, cluster);
        lock.acquire(LockWait::For(LOCK_TIMEOUT)).await?;
        let result = self.remove_daemon_locked(cluster, daemon, force, force_delete_data).await;
        lock.release();
        result
    }

    async fn remove_daemon_locked(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        force: bool,
        force_delete_data: bool,
    ) -> Result<()> {
        if daemon.kind.requires_force_on_remove() && !force {
            return Err(Error::DangerousWithoutForce { kind: daemon.kind });
        }

        self.teardown_unit(cluster, daemon).await;
        self.remove_containers(cluster, daemon).await;

        let data_dir = self.ctx.layout.daemon_dir(cluster, daemon);
        if !data_dir.exists() {
            return Ok(());
        }
        if daemon.kind.is_dangerous() && !force_delete_data {
            let removed = self.ctx.layout.removed_dir(cluster);
            layout::makedirs(&removed, layout::DATA_DIR_MODE, None)?;
            let backup = removed.join(Layout::backup_name(daemon));
            std::fs::rename(&data_dir, &backup)?;
            info!(daemon = %daemon, backup = %backup.display(), "data dir backed up");
        } else {
            std::fs::remove_dir_all(&data_dir)?;
            info!(daemon = %daemon, "data dir deleted");
        }
        Ok(())
    }

    /// Stop/reset-failed/disable one daemon's unit, tolerating absence.
    async fn teardown_unit(&self, cluster: &ClusterId, daemon: &DaemonId) {
        let unit = compose::service_name(cluster, daemon);
        let units = &self.services.units;
        if let Err(e) = units.stop(&unit).await {
            warn!(unit = %unit, error = %e, "stop failed");
        }
        if let Err(e) = units.reset_failed(&unit).await {
            warn!(unit = %unit, error = %e, "reset-failed failed");
        }
        if let Err(e) = units.disable(&unit).await {
            warn!(unit = %unit, error = %e, "disable failed");
        }
    }

    /// Remove both remembered container names, ignoring absence.
    async fn remove_containers(&self, cluster: &ClusterId, daemon: &DaemonId) {
        let composer = Composer::new(&self.ctx.runtime, cluster, daemon, "");
        for argv in composer.rm_cmds() {
            if let Err(e) = self.services.engine.call(&argv, self.ctx.timeout).await {
                warn!(error = %e, "container removal failed");
            }
        }
    }

    /// Tear down a whole cluster on this host.
    pub async fn remove_cluster(
        &self,
        cluster: &ClusterId,
        zap_osds: bool,
        keep_logs: bool,
    ) -> Result<()> {
        let mut lock = ClusterLock::new(&self.ctx.lock_dir, cluster);
        lock.acquire(LockWait::For(LOCK_TIMEOUT)).await?;
        let result = self.remove_cluster_locked(cluster, zap_osds, keep_logs).await;
        lock.release();
        result
    }

    async fn remove_cluster_locked(
        &self,
        cluster: &ClusterId,
        zap_osds: bool,
        keep_logs: bool,
    ) -> Result<()> {
        for (daemon, _) in self.ctx.layout.daemon_dirs(cluster)? {
            self.teardown_unit(cluster, &daemon).await;
            self.remove_containers(cluster, &daemon).await;
        }

        let units = &self.services.units;
        let cluster_target = systemd::cluster_target_name(cluster);
        for target in [cluster_target.as_str(), GLOBAL_TARGET] {
            if let Err(e) = units.stop(target).await {
                warn!(target, error = %e, "target stop failed");
            }
            if let Err(e) = units.disable(target).await {
                warn!(target, error = %e, "target disable failed");
            }
        }
        let slice = format!("system-silo\\x2d{}.slice", cluster.as_str().replace('-', "\\x2d"));
        if let Err(e) = units.stop(&slice).await {
            warn!(slice = %slice, error = %e, "slice stop failed");
        }

        if zap_osds {
            self.zap_osds(cluster).await?;
        }

        // Unit files: the service template and both target files.
        for name in [
            systemd::service_template_name(cluster),
            cluster_target,
            GLOBAL_TARGET.to_string(),
        ] {
            let path = self.ctx.unit_dir.join(&name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        if let Err(e) = units.daemon_reload().await {
            warn!(error = %e, "daemon-reload failed");
        }

        let cluster_dir = self.ctx.layout.cluster_dir(cluster);
        if cluster_dir.exists() {
            std::fs::remove_dir_all(&cluster_dir)?;
        }
        if !keep_logs {
            let log_dir = self.ctx.layout.log_dir(cluster);
            if log_dir.exists() {
                std::fs::remove_dir_all(&log_dir)?;
            }
        }
        logrotate::remove_cluster(&self.ctx.logrotate_dir, cluster)?;
        sysctl::remove_cluster_fragments(&self.ctx.sysctl_dir, cluster)?;

        if self.ctx.layout.clusters()?.is_empty() {
            logrotate::remove_tool(&self.ctx.logrotate_dir)?;
            self.remove_host_admin_files(cluster)?;
        }
        info!(cluster = %cluster, "cluster removed");
        Ok(())
    }

    /// Drop the host admin keyring, and the admin config only when its
    /// parsed fsid value names this cluster. A mention in a comment does
    /// not count.
    fn remove_host_admin_files(&self, cluster: &ClusterId) -> Result<()> {
        let keyring = self.ctx.admin_keyring_path();
        if keyring.exists() {
            std::fs::remove_file(&keyring)?;
        }
        let config = self.ctx.admin_config_path();
        if config.exists() {
            let content = std::fs::read_to_string(&config)?;
            if conf::parse_value(&content, "fsid").as_deref() == Some(cluster.as_str()) {
                std::fs::remove_file(&config)?;
            }
        }
        Ok(())
    }

    /// Destroy this cluster's OSD devices with a transient container.
    pub async fn zap_osds(&self, cluster: &ClusterId) -> Result<()> {
        let args = vec![
            "lvm".to_string(),
            "zap".to_string(),
            "--destroy".to_string(),
            "--cluster-fsid".to_string(),
            cluster.to_string(),
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
        silo_host::engine::call_checked(self.services.engine.as_ref(), &argv, self.ctx.timeout)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "remove_tests.rs"]
mod tests;
