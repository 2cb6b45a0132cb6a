// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon deploy: fresh, redeploy and reconfigure.
//!
//! Ordering within one deploy: lock, preflight, filesystem, units,
//! firewall. Everything before the first filesystem write is
//! side-effect free; everything after it stays on disk when a later
//! step fails, with `unit.configured` written last as the health marker.

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::{self, ComposedRun, Composer, RuntimeKind, UnitStyle};
use silo_core::config::DeployConfig;
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use silo_core::registry;
use silo_host::engine::call_checked;
use silo_host::layout::{self, FILE_MODE};
use silo_host::lock::{ClusterLock, LockWait};
use silo_host::systemd::{self, UnitRenderCtx, GLOBAL_TARGET};
use silo_host::{logrotate, sysctl};
use tracing::{info, warn};

use crate::context::Engine;
use crate::ports;
use crate::scripts;

/// How long a command waits for another siloadm holding the cluster lock.
pub(crate) const LOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable forwarded into spawned containers for the
/// manager's OSD placement logic.
pub(crate) const OSDSPEC_AFFINITY_ENV: &str = "SILO_OSDSPEC_AFFINITY";

/// One `deploy` invocation.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub cluster: ClusterId,
    pub daemon: DaemonId,
    pub config: DeployConfig,
    pub reconfig: bool,
    pub allow_ptrace: bool,
    pub osd_fsid: Option<String>,
    /// Per-deploy image override; falls back to the global `--image`,
    /// then the descriptor default.
    pub image: Option<String>,
}

impl DeployRequest {
    pub fn new(cluster: ClusterId, daemon: DaemonId) -> Self {
        Self {
            cluster,
            daemon,
            config: DeployConfig::default(),
            reconfig: false,
            allow_ptrace: false,
            osd_fsid: None,
            image: None,
        }
    }
}

impl Engine {
    pub async fn deploy(&self, req: &DeployRequest) -> Result<()> {
        let mut lock = ClusterLock::new(&self.ctx.lock_dir, &req.cluster);
        self.deploy_inner(req, &mut lock).await
    }

    /// Deploy under a caller-held lock; bootstrap nests through here.
    pub(crate) async fn deploy_inner(
        &self,
        req: &DeployRequest,
        lock: &mut ClusterLock,
    ) -> Result<()> {
        lock.acquire(LockWait::For(LOCK_TIMEOUT)).await?;
        let result = self.deploy_locked(req).await;
        lock.release();
        result
    }

    async fn deploy_locked(&self, req: &DeployRequest) -> Result<()> {
        let kind = req.daemon.kind;

        let data_dir = self.ctx.layout.daemon_dir(&req.cluster, &req.daemon);
        let fresh = !data_dir.is_dir();
        if req.reconfig && !fresh {
            info!(daemon = %req.daemon, "reconfiguring");
        } else if req.reconfig {
            return Err(Error::MissingData);
        } else if fresh {
            info!(daemon = %req.daemon, "deploying");
        } else {
            info!(daemon = %req.daemon, "redeploying");
        }
        registry::validate(kind, &req.config)?;

        let ports = declared_ports(kind, &req.config);
        if fresh || req.reconfig {
            ports::check_ports(&req.daemon, &ports)?;
        }

        if kind == DaemonKind::Agent {
            return self.deploy_agent(req, &ports).await;
        }

        let image = self.resolve_image(req);
        let owner = self.resolve_owner(kind, &req.config, &image).await?;

        // First write: from here on, failures leave the dir for forensics.
        self.ctx.layout.make_daemon_dirs(&req.cluster, &req.daemon, Some(owner))?;
        for sub in registry::descriptor(kind).data_subdirs {
            layout::makedirs(&data_dir.join(sub), layout::DATA_DIR_MODE, Some(owner))?;
        }
        if kind == DaemonKind::Mon && fresh {
            self.mon_mkfs(req, &image, owner).await?;
        }
        materialize_files(kind, &req.config, &data_dir, owner)?;

        let composed = self.compose_daemon(req, &image);
        let run = composed.run_cmd();
        self.write_unit_scripts(req, &data_dir, &image, owner, &composed, &run)?;

        if sysctl::install(&self.ctx.sysctl_dir, &req.cluster, kind)? {
            sysctl::reload(self.ctx.timeout).await;
        }
        logrotate::install_cluster(
            &self.ctx.logrotate_dir,
            &req.cluster,
            &self.ctx.layout.log_root,
        )?;
        logrotate::install_tool(&self.ctx.logrotate_dir, &self.ctx.layout.log_root)?;

        self.install_and_start(&req.cluster, &req.daemon, &run.style, req.reconfig, kind)
            .await?;

        if !ports.is_empty() {
            self.services.firewall.open_ports(&ports).await;
            self.services.firewall.apply().await;
        }

        layout::touch(&data_dir.join(layout::UNIT_CONFIGURED), Some(owner))?;
        info!(daemon = %req.daemon, cluster = %req.cluster, "deploy complete");
        Ok(())
    }

    fn resolve_image(&self, req: &DeployRequest) -> String {
        if let Some(image) = &req.image {
            return image.clone();
        }
        if req.daemon.kind == DaemonKind::Container {
            if let Some(image) = req.config.str_arg("image") {
                return image.to_string();
            }
        }
        if req.daemon.kind.is_storage() && !self.ctx.image.is_empty() {
            return self.ctx.image.clone();
        }
        let default = registry::descriptor(req.daemon.kind).default_image;
        if default.is_empty() {
            self.ctx.image.clone()
        } else {
            default.to_string()
        }
    }

    /// Build the long-running container for this daemon.
    pub(crate) fn compose_daemon<'a>(
        &'a self,
        req: &'a DeployRequest,
        image: &str,
    ) -> Composer<'a> {
        let kind = req.daemon.kind;
        let mut composer =
            Composer::new(&self.ctx.runtime, &req.cluster, &req.daemon, image);
        composer.entrypoint = registry::descriptor(kind)
            .entrypoint
            .map(str::to_string)
            .or_else(|| req.config.str_arg("entrypoint").map(str::to_string));
        composer.args =
            registry::extra_daemon_args(kind, &req.daemon.id, &req.config);
        composer.envs = self.ctx.envs.clone();
        if let Ok(affinity) = std::env::var(OSDSPEC_AFFINITY_ENV) {
            composer.envs.push(format!("{OSDSPEC_AFFINITY_ENV}={affinity}"));
        }
        composer.volumes = mounts_for(
            kind,
            &req.daemon,
            &self.ctx.layout.daemon_dir(&req.cluster, &req.daemon),
            &self.ctx.layout.log_dir(&req.cluster),
        );
        for bind in &req.config.bind_mounts {
            composer.volumes.push(bind.to_volume_arg());
        }
        composer.privileged =
            req.config.privileged || matches!(kind, DaemonKind::Osd | DaemonKind::Iscsi);
        composer.ptrace = req.allow_ptrace;
        composer.init = self.ctx.container_init;
        composer.memory_limit = req.config.memory_limit;
        composer
    }

    pub(crate) fn write_unit_scripts(
        &self,
        req: &DeployRequest,
        data_dir: &Path,
        image: &str,
        owner: (u32, u32),
        composer: &Composer<'_>,
        run: &ComposedRun,
    ) -> Result<()> {
        let kind = req.daemon.kind;
        let data_dir_str = data_dir.display().to_string();

        let mut preamble: Vec<String> = Vec::new();
        let mut poststop: Vec<Vec<String>> = composer.stop_cmds();
        match kind {
            DaemonKind::Osd => {
                let osd_fsid = req
                    .osd_fsid
                    .clone()
                    .or_else(|| req.config.str_arg("osd_fsid").map(str::to_string))
                    .ok_or_else(|| {
                        Error::InvalidArgs("deploying an osd requires --osd-fsid".into())
                    })?;
                preamble.push(scripts::shell_line(&scripts::osd_activate_cmd(
                    &self.ctx.runtime,
                    image,
                    &req.daemon.id,
                    &osd_fsid,
                    &composer.volumes,
                    &composer.envs,
                )));
                poststop.push(scripts::osd_deactivate_cmd(
                    &self.ctx.runtime,
                    image,
                    &req.daemon.id,
                    &composer.volumes,
                    &composer.envs,
                ));
            }
            DaemonKind::Iscsi => {
                preamble
                    .push(scripts::shell_line(&scripts::iscsi_configfs_mount_cmd(&data_dir_str)));
                // The TCMU runner rides next to rbd-target-api.
                let mut tcmu = Composer::new(
                    &self.ctx.runtime,
                    &req.cluster,
                    &req.daemon,
                    image,
                );
                tcmu.entrypoint = Some("/usr/bin/tcmu-runner".to_string());
                tcmu.volumes = composer.volumes.clone();
                tcmu.privileged = true;
                let mut tcmu_run = tcmu.run_cmd().argv;
                // A second container under the same unit needs its own name.
                if let Some(pos) = tcmu_run.iter().position(|a| a == "--name") {
                    tcmu_run[pos + 1] = format!("{}-tcmu", composer.container_name());
                }
                preamble.push(format!("{} &", scripts::shell_line(&tcmu_run)));
                poststop.push(scripts::iscsi_configfs_umount_cmd(&data_dir_str));
            }
            _ => {}
        }

        layout::write_file(
            &data_dir.join(layout::UNIT_RUN),
            scripts::render_run(&req.cluster, &req.daemon, &preamble, run).as_bytes(),
            FILE_MODE,
            Some(owner),
        )?;
        layout::write_file(
            &data_dir.join(layout::UNIT_STOP),
            scripts::render_stop(&composer.stop_cmds()).as_bytes(),
            FILE_MODE,
            Some(owner),
        )?;
        layout::write_file(
            &data_dir.join(layout::UNIT_POSTSTOP),
            scripts::render_poststop(&poststop).as_bytes(),
            FILE_MODE,
            Some(owner),
        )?;
        layout::write_file(
            &data_dir.join(layout::UNIT_IMAGE),
            format!("{image}\n").as_bytes(),
            FILE_MODE,
            Some(owner),
        )?;
        self.write_unit_meta(req, data_dir, Some(owner))?;
        layout::touch_once(&data_dir.join(layout::UNIT_CREATED), Some(owner))?;
        Ok(())
    }

    fn write_unit_meta(
        &self,
        req: &DeployRequest,
        data_dir: &Path,
        owner: Option<(u32, u32)>,
    ) -> Result<()> {
        let meta = json!({
            "service_name": compose::service_name(&req.cluster, &req.daemon),
            "ports": declared_ports(req.daemon.kind, &req.config),
            "memory_request": req.config.memory_request,
            "memory_limit": req.config.memory_limit,
            "extra": req.config.meta,
        });
        layout::write_file(
            &data_dir.join(layout::UNIT_META),
            serde_json::to_vec_pretty(&meta)?.as_slice(),
            FILE_MODE,
            owner,
        )
    }

    /// Install base units and drive systemd through the deploy sequence.
    pub(crate) async fn install_and_start(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        style: &UnitStyle,
        reconfig: bool,
        kind: DaemonKind,
    ) -> Result<()> {
        let cluster_data_dir = self.ctx.layout.cluster_dir(cluster);
        let runtime_binary = self.ctx.runtime.binary_str();
        let render_ctx = UnitRenderCtx {
            cluster,
            cluster_data_dir: &cluster_data_dir,
            runtime_binary: &runtime_binary,
            docker_family: self.ctx.runtime.kind == RuntimeKind::Docker,
            style,
        };
        systemd::install_base_units(&self.ctx.unit_dir, &render_ctx)?;
        let units = &self.services.units;
        units.daemon_reload().await?;

        let unit = compose::service_name(cluster, daemon);
        if reconfig {
            if !kind.is_storage() {
                units.restart(&unit).await?;
            }
            return Ok(());
        }

        // Stop/reset tolerate a unit that was never started.
        if let Err(e) = units.stop(&unit).await {
            warn!(unit = %unit, error = %e, "pre-start stop failed");
        }
        if let Err(e) = units.reset_failed(&unit).await {
            warn!(unit = %unit, error = %e, "reset-failed failed");
        }
        units.enable(&unit).await?;
        units.enable(GLOBAL_TARGET).await?;
        units.enable(&systemd::cluster_target_name(cluster)).await?;
        systemd::trim_stale_cgroup(Path::new("/sys/fs/cgroup"), cluster, &unit);
        units.start(&unit).await?;
        Ok(())
    }

    /// Install units and enable without starting; adoption of a stopped
    /// legacy daemon keeps it stopped.
    pub(crate) async fn install_and_enable_only(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        style: &UnitStyle,
    ) -> Result<()> {
        let cluster_data_dir = self.ctx.layout.cluster_dir(cluster);
        let runtime_binary = self.ctx.runtime.binary_str();
        let render_ctx = UnitRenderCtx {
            cluster,
            cluster_data_dir: &cluster_data_dir,
            runtime_binary: &runtime_binary,
            docker_family: self.ctx.runtime.kind == RuntimeKind::Docker,
            style,
        };
        systemd::install_base_units(&self.ctx.unit_dir, &render_ctx)?;
        let units = &self.services.units;
        units.daemon_reload().await?;
        let unit = compose::service_name(cluster, daemon);
        units.enable(&unit).await?;
        units.enable(GLOBAL_TARGET).await?;
        units.enable(&systemd::cluster_target_name(cluster)).await?;
        Ok(())
    }

    /// Format a fresh monitor store with a transient container before
    /// the data dir is populated.
    async fn mon_mkfs(
        &self,
        req: &DeployRequest,
        image: &str,
        owner: (u32, u32),
    ) -> Result<()> {
        let data_dir = self.ctx.layout.daemon_dir(&req.cluster, &req.daemon);
        let tmp_config = data_dir.join("tmp.config");
        let tmp_keyring = data_dir.join("tmp.keyring");
        // validate() guaranteed both files are present for the mon kind.
        let config = req.config.files.get("config").map(String::as_str).unwrap_or("");
        let keyring = req.config.files.get("keyring").map(String::as_str).unwrap_or("");
        layout::write_file(&tmp_config, config.as_bytes(), FILE_MODE, Some(owner))?;
        layout::write_file(&tmp_keyring, keyring.as_bytes(), FILE_MODE, Some(owner))?;

        let mut volumes = vec![
            format!("{}:/var/lib/silo/mon.{}:z", data_dir.display(), req.daemon.id),
            format!("{}:/tmp/config:z", tmp_config.display()),
            format!("{}:/tmp/keyring:z", tmp_keyring.display()),
        ];
        let mut args = vec![
            "--mkfs".to_string(),
            "-i".to_string(),
            req.daemon.id.clone(),
            "--fsid".to_string(),
            req.cluster.to_string(),
            "-c".to_string(),
            "/tmp/config".to_string(),
            "--keyring".to_string(),
            "/tmp/keyring".to_string(),
        ];
        // Bootstrap formats against its freshly generated monmap.
        if let Some(monmap) = req.config.str_arg("monmap") {
            volumes.push(format!("{monmap}:/tmp/monmap:z"));
            args.push("--monmap".to_string());
            args.push("/tmp/monmap".to_string());
        }
        let argv = compose::one_shot_cmd(
            &self.ctx.runtime,
            image,
            Some("/usr/bin/silo-mon"),
            &args,
            &volumes,
            &[],
        );
        call_checked(self.services.engine.as_ref(), &argv, self.ctx.timeout).await?;
        std::fs::remove_file(&tmp_config)?;
        std::fs::remove_file(&tmp_keyring)?;
        Ok(())
    }

    /// The agent deploys as unit files around this binary, never through
    /// the composer.
    async fn deploy_agent(&self, req: &DeployRequest, ports: &[u16]) -> Result<()> {
        let data_dir =
            self.ctx.layout.make_daemon_dirs(&req.cluster, &req.daemon, None)?;
        for (name, content) in &req.config.files {
            layout::write_file(&data_dir.join(name), content.as_bytes(), FILE_MODE, None)?;
        }
        let binary = std::env::current_exe()?.display().to_string();
        layout::write_file(
            &data_dir.join(layout::UNIT_RUN),
            scripts::agent_run(&binary, &req.cluster, &req.daemon).as_bytes(),
            FILE_MODE,
            None,
        )?;
        layout::write_file(
            &data_dir.join(layout::UNIT_STOP),
            b"#!/bin/bash\n",
            FILE_MODE,
            None,
        )?;
        layout::write_file(
            &data_dir.join(layout::UNIT_POSTSTOP),
            b"#!/bin/bash\n",
            FILE_MODE,
            None,
        )?;
        layout::write_file(&data_dir.join(layout::UNIT_IMAGE), b"\n", FILE_MODE, None)?;
        self.write_unit_meta(req, &data_dir, None)?;
        layout::touch_once(&data_dir.join(layout::UNIT_CREATED), None)?;

        let style = UnitStyle { forking: false, pid_file: None, cid_file: None };
        self.install_and_start(&req.cluster, &req.daemon, &style, req.reconfig, DaemonKind::Agent)
            .await?;
        if !ports.is_empty() {
            self.services.firewall.open_ports(ports).await;
            self.services.firewall.apply().await;
        }
        layout::touch(&data_dir.join(layout::UNIT_CONFIGURED), None)?;
        Ok(())
    }
}

/// The ports this deploy declares: caller-supplied, else descriptor
/// defaults.
pub(crate) fn declared_ports(kind: DaemonKind, config: &DeployConfig) -> Vec<u16> {
    if config.ports.is_empty() {
        registry::descriptor(kind).default_ports.to_vec()
    } else {
        config.ports.clone()
    }
}

/// Place the structured config's files in the daemon dir, under the
/// kind's conventional subtree when it has one. Absolute names are
/// re-rooted below the data dir.
fn materialize_files(
    kind: DaemonKind,
    config: &DeployConfig,
    data_dir: &Path,
    owner: (u32, u32),
) -> Result<()> {
    let subdir = registry::descriptor(kind).config_subdir;
    for (name, content) in &config.files {
        let dest = match (subdir, name.starts_with('/')) {
            (_, true) => data_dir.join(name.trim_start_matches('/')),
            (Some(sub), false) => data_dir.join(sub).join(name),
            (None, false) => data_dir.join(name),
        };
        if let Some(parent) = dest.parent() {
            layout::makedirs(parent, layout::DATA_DIR_MODE, Some(owner))?;
        }
        layout::write_file(&dest, content.as_bytes(), FILE_MODE, Some(owner))?;
    }
    Ok(())
}

/// Volume mounts per kind.
fn mounts_for(
    kind: DaemonKind,
    daemon: &DaemonId,
    data_dir: &Path,
    log_dir: &Path,
) -> Vec<String> {
    let data = data_dir.display();
    let log = log_dir.display();
    match kind {
        DaemonKind::Mon | DaemonKind::Mgr | DaemonKind::Mds | DaemonKind::Rgw
        | DaemonKind::Mirror | DaemonKind::Crash => vec![
            format!("{data}:/var/lib/silo/{daemon}:z"),
            format!("{data}/config:/etc/silo/silo.conf:z"),
            format!("{log}:/var/log/silo:z"),
        ],
        DaemonKind::Osd => vec![
            format!("{data}:/var/lib/silo/{daemon}:z"),
            format!("{data}/config:/etc/silo/silo.conf:z"),
            format!("{log}:/var/log/silo:z"),
            "/dev:/dev".to_string(),
            "/run/udev:/run/udev".to_string(),
            "/sys:/sys".to_string(),
        ],
        DaemonKind::Prometheus => vec![
            format!("{data}/etc/prometheus:/etc/prometheus:Z"),
            format!("{data}/data:/prometheus:Z"),
        ],
        DaemonKind::Alertmanager => vec![
            format!("{data}/etc/alertmanager:/etc/alertmanager:Z"),
            format!("{data}/data:/alertmanager:Z"),
        ],
        DaemonKind::Grafana => vec![
            format!("{data}/etc/grafana:/etc/grafana:Z"),
            format!("{data}/data:/var/lib/grafana:Z"),
        ],
        DaemonKind::NodeExporter => vec![
            "/proc:/host/proc:ro".to_string(),
            "/sys:/host/sys:ro".to_string(),
            "/:/rootfs:ro".to_string(),
        ],
        DaemonKind::Nfs => vec![
            format!("{data}/etc/ganesha:/etc/ganesha:z"),
            format!("{log}:/var/log/silo:z"),
        ],
        DaemonKind::Iscsi => vec![
            format!("{data}:/var/lib/silo/{daemon}:z"),
            format!("{data}/configfs:/sys/kernel/config"),
            format!("{log}:/var/log/silo:z"),
            "/dev:/dev".to_string(),
        ],
        DaemonKind::Haproxy => vec![format!("{data}/haproxy:/var/lib/haproxy:z")],
        DaemonKind::Keepalived => {
            vec![format!("{data}/keepalived:/etc/keepalived:z")]
        }
        DaemonKind::SnmpGateway | DaemonKind::Container | DaemonKind::Agent => Vec::new(),
    }
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
