// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-host cluster genesis.
//!
//! Ordered steps, each idempotent on its own but not as a whole: output
//! guard, identity allocation, monitor address canonicalization, image
//! release guard, key and monmap generation through transient
//! containers, monitor and manager deploys with bounded waits, SSH and
//! dashboard preparation, optional service spec application.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use silo_core::addr::{self, AddrVec};
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::one_shot_cmd;
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use silo_core::net;
use silo_core::registry::PINNED_RELEASE;
use silo_core::yamlspec;
use silo_host::engine::{call_checked, call_retry};
use silo_host::exec::{self, CommandOutput};
use silo_host::layout::{self, FILE_MODE};
use silo_host::lock::{ClusterLock, LockWait};
use tracing::{debug, info, warn};

use crate::context::Engine;
use crate::deploy::{DeployRequest, LOCK_TIMEOUT};
use crate::facts;

/// Everything `bootstrap` accepts.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub cluster: Option<ClusterId>,
    pub mon_ip: Option<String>,
    pub cluster_network: Option<String>,
    pub skip_mon_network: bool,
    pub skip_pull: bool,
    pub skip_ssh: bool,
    pub skip_dashboard: bool,
    pub allow_overwrite: bool,
    pub allow_mismatched_release: bool,
    pub output_config: Option<PathBuf>,
    pub output_keyring: Option<PathBuf>,
    pub output_pub_ssh_key: Option<PathBuf>,
    pub initial_config: Option<PathBuf>,
    pub ssh_user: String,
    pub dashboard_port: Option<u16>,
    pub dashboard_user: String,
    pub dashboard_password: Option<String>,
    pub dashboard_crt: Option<PathBuf>,
    pub dashboard_key: Option<PathBuf>,
    pub apply_spec: Option<PathBuf>,
    /// Bounded wait loops: attempts and inter-try sleep.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            cluster: None,
            mon_ip: None,
            cluster_network: None,
            skip_mon_network: false,
            skip_pull: false,
            skip_ssh: false,
            skip_dashboard: false,
            allow_overwrite: false,
            allow_mismatched_release: false,
            output_config: None,
            output_keyring: None,
            output_pub_ssh_key: None,
            initial_config: None,
            ssh_user: "root".to_string(),
            dashboard_port: None,
            dashboard_user: "admin".to_string(),
            dashboard_password: None,
            dashboard_crt: None,
            dashboard_key: None,
            apply_spec: None,
            retries: 15,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Admin CLI access assembled during bootstrap: every management command
/// runs as a transient container against the new monitor.
struct AdminCli<'a> {
    engine: &'a Engine,
    image: String,
    config: PathBuf,
    keyring: PathBuf,
    tmp_dir: PathBuf,
}

impl AdminCli<'_> {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let volumes = vec![
            format!("{}:/etc/silo/silo.conf:z", self.config.display()),
            format!("{}:/etc/silo/silo.client.admin.keyring:z", self.keyring.display()),
            format!("{}:/work:z", self.tmp_dir.display()),
        ];
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let argv = one_shot_cmd(
            &self.engine.ctx.runtime,
            &self.image,
            Some("/usr/bin/silo"),
            &args,
            &volumes,
            &self.engine.ctx.envs,
        );
        call_checked(self.engine.services.engine.as_ref(), &argv, self.engine.ctx.timeout).await
    }

    /// Retry a command until it succeeds or the attempts run out.
    async fn wait_for(&self, args: &[&str], what: &str, opts: &BootstrapOptions) -> Result<CommandOutput> {
        let mut last: Option<Error> = None;
        for attempt in 1..=opts.retries.max(1) {
            match self.run(args).await {
                Ok(out) => return Ok(out),
                Err(e) => {
                    debug!(what, attempt, error = %e, "not ready yet");
                    last = Some(e);
                    if attempt < opts.retries {
                        tokio::time::sleep(opts.retry_delay).await;
                    }
                }
            }
        }
        Err(last.unwrap_or_else(|| Error::InvalidArgs(format!("{what} never became ready"))))
    }
}

impl Engine {
    pub async fn bootstrap(&self, opts: &BootstrapOptions) -> Result<()> {
        // Output files first: abort before any side effect.
        let config_out = opts.output_config.clone().unwrap_or_else(|| self.ctx.admin_config_path());
        let keyring_out =
            opts.output_keyring.clone().unwrap_or_else(|| self.ctx.admin_keyring_path());
        let ssh_key_out = opts
            .output_pub_ssh_key
            .clone()
            .unwrap_or_else(|| self.ctx.config_dir.join("silo.pub"));
        if !opts.allow_overwrite {
            for path in [&config_out, &keyring_out, &ssh_key_out] {
                if path.exists() {
                    return Err(Error::InvalidArgs(format!(
                        "output file {} already exists; pass --allow-overwrite to reuse it",
                        path.display()
                    )));
                }
            }
        }

        let cluster = opts.cluster.clone().unwrap_or_else(ClusterId::generate);
        let mon_id = facts::hostname();
        let mgr_id = format!("{mon_id}.{}", random_lowercase(6));
        info!(cluster = %cluster, mon = %mon_id, mgr = %mgr_id, "bootstrapping new cluster");

        let mut lock = ClusterLock::new(&self.ctx.lock_dir, &cluster);
        lock.acquire(LockWait::For(LOCK_TIMEOUT)).await?;
        let result = self
            .bootstrap_locked(opts, &cluster, &mon_id, &mgr_id, &config_out, &keyring_out, &ssh_key_out, &mut lock)
            .await;
        lock.release();
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn bootstrap_locked(
        &self,
        opts: &BootstrapOptions,
        cluster: &ClusterId,
        mon_id: &str,
        mgr_id: &str,
        config_out: &Path,
        keyring_out: &Path,
        ssh_key_out: &Path,
        lock: &mut ClusterLock,
    ) -> Result<()> {
        // Monitor address canonicalization and network inference.
        let mon_ip = opts
            .mon_ip
            .as_deref()
            .ok_or_else(|| Error::InvalidArgs("--mon-ip is required".into()))?;
        let parsed = addr::parse_mon_addr(mon_ip)?;
        for warning in &parsed.warnings {
            warn!("{warning}");
        }
        let addrv = parsed.addrs.clone();
        let mon_network = if opts.skip_mon_network {
            None
        } else {
            Some(self.infer_mon_network(&addrv).await?)
        };
        let cluster_network = match &opts.cluster_network {
            Some(nets) => {
                let parsed = net::parse_cidr_list(nets)?;
                Some(parsed.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(","))
            }
            None => None,
        };

        // Image: pull, then hold the release guard against its version.
        if !opts.skip_pull {
            self.pull_image().await?;
        }
        let release = self.image_release().await?;
        if release != PINNED_RELEASE && !opts.allow_mismatched_release {
            return Err(Error::ImageReleaseMismatch {
                expected: PINNED_RELEASE.to_string(),
                found: release,
            });
        }

        let owner = self.stat_owner_in_image(&self.ctx.image).await?;

        // Three keys from the transient keytool.
        let mon_key = self.keytool_key().await?;
        let admin_key = self.keytool_key().await?;
        let mgr_key = self.keytool_key().await?;

        let cluster_dir = self.ctx.layout.cluster_dir(cluster);
        let tmp_dir = cluster_dir.join("tmp");
        layout::makedirs(&cluster_dir, layout::DATA_DIR_MODE, Some(owner))?;
        layout::makedirs(&tmp_dir, layout::DATA_DIR_MODE, None)?;

        let mon_keyring = format!(
            "[mon.]\n\tkey = {mon_key}\n\tcaps mon = allow *\n\
             [client.admin]\n\tkey = {admin_key}\n\tcaps mon = allow *\n\tcaps mds = allow *\n\tcaps mgr = allow *\n\tcaps osd = allow *\n\
             [mgr.{mgr_id}]\n\tkey = {mgr_key}\n\tcaps mon = profile mgr\n\tcaps mds = allow *\n\tcaps osd = allow *\n"
        );
        let admin_keyring = format!(
            "[client.admin]\n\tkey = {admin_key}\n\tcaps mon = allow *\n\tcaps mds = allow *\n\tcaps mgr = allow *\n\tcaps osd = allow *\n"
        );
        if let Some(parent) = keyring_out.parent() {
            layout::makedirs(parent, 0o755, None)?;
        }
        layout::write_file(keyring_out, admin_keyring.as_bytes(), FILE_MODE, None)?;

        // Initial monmap through the transient monmaptool.
        self.make_monmap(cluster, mon_id, &addrv, &tmp_dir).await?;

        // Monitor config, written to the admin path so the CLI helper
        // works from the first wait loop.
        let bootstrap_config = format!(
            "# minimal silo.conf for {cluster}\n[global]\n\tfsid = {cluster}\n\tmon_host = {addrv}\n"
        );
        layout::write_file(config_out, bootstrap_config.as_bytes(), 0o644, None)?;

        // Deploy the monitor through the regular path; the lock nests.
        let mon_daemon = DaemonId::new(DaemonKind::Mon, mon_id);
        let mut mon_req = DeployRequest::new(cluster.clone(), mon_daemon.clone());
        mon_req.config.files.insert("config".into(), bootstrap_config.clone());
        mon_req.config.files.insert("keyring".into(), mon_keyring.clone());
        mon_req.config.extra.insert(
            "monmap".into(),
            Value::String(tmp_dir.join("monmap").display().to_string()),
        );
        self.deploy_inner(&mon_req, lock).await?;

        let cli = AdminCli {
            engine: self,
            image: self.ctx.image.clone(),
            config: config_out.to_path_buf(),
            keyring: keyring_out.to_path_buf(),
            tmp_dir: tmp_dir.clone(),
        };
        cli.wait_for(&["status"], "monitor", opts).await?;
        info!("monitor is ready");

        // Config assimilation and the minimized rewrite.
        if let Some(initial) = &opts.initial_config {
            let content = std::fs::read_to_string(initial)?;
            layout::write_file(&tmp_dir.join("initial.conf"), content.as_bytes(), FILE_MODE, None)?;
            cli.run(&["config", "assimilate-conf", "-i", "/work/initial.conf"]).await?;
        }
        let minimized = cli.run(&["config", "generate-minimal-conf"]).await?;
        if !minimized.stdout.trim().is_empty() {
            layout::write_file(config_out, minimized.stdout.as_bytes(), 0o644, None)?;
        }
        let mon_unit = silo_core::compose::service_name(cluster, &mon_daemon);
        self.services.units.restart(&mon_unit).await?;
        cli.wait_for(&["status"], "monitor", opts).await?;

        // Public/cluster network and IPv6 binding.
        if let Some(network) = &mon_network {
            cli.run(&["config", "set", "mon", "public_network", network.as_str()]).await?;
        }
        if let Some(network) = &cluster_network {
            cli.run(&["config", "set", "global", "cluster_network", network.as_str()]).await?;
        }
        if addrv.primary_ip().is_some_and(|ip| ip.is_ipv6()) {
            cli.run(&["config", "set", "global", "ms_bind_ipv6", "true"]).await?;
        }

        // Manager.
        let mgr_daemon = DaemonId::new(DaemonKind::Mgr, mgr_id);
        let mgr_keyring = format!(
            "[mgr.{mgr_id}]\n\tkey = {mgr_key}\n\tcaps mon = profile mgr\n\tcaps mds = allow *\n\tcaps osd = allow *\n"
        );
        let mut mgr_req = DeployRequest::new(cluster.clone(), mgr_daemon);
        mgr_req.config.files.insert("config".into(), bootstrap_config);
        mgr_req.config.files.insert("keyring".into(), mgr_keyring);
        self.deploy_inner(&mgr_req, lock).await?;
        self.wait_for_mgr(&cli, opts).await?;
        info!("manager is ready");

        if !opts.skip_ssh {
            self.prepare_ssh(opts, cluster, &cli, &tmp_dir, ssh_key_out).await?;
        }

        // Orchestration backend.
        cli.run(&["mgr", "module", "enable", "orchestrator"]).await?;
        cli.run(&["orch", "set", "backend", "silo"]).await?;
        self.wait_for_mgr(&cli, opts).await?;

        if !opts.skip_dashboard {
            self.prepare_dashboard(opts, &cli, &tmp_dir).await?;
        }

        if let Some(spec) = &opts.apply_spec {
            self.apply_spec(spec, &cli, &tmp_dir).await?;
        }

        info!(cluster = %cluster, "bootstrap complete");
        Ok(())
    }

    async fn infer_mon_network(&self, addrv: &AddrVec) -> Result<String> {
        let ip = addrv
            .primary_ip()
            .ok_or_else(|| Error::InvalidArgs("empty monitor address vector".into()))?;
        let networks = facts::list_networks(self.ctx.timeout).await?;
        net::containing_net(&ip, &networks)
            .map(str::to_string)
            .ok_or(Error::NetworkInferFailure { addr: ip })
    }

    async fn pull_image(&self) -> Result<()> {
        let argv =
            vec![self.ctx.runtime.binary_str(), "pull".to_string(), self.ctx.image.clone()];
        call_retry(
            self.services.engine.as_ref(),
            &argv,
            // Pulls legitimately take minutes.
            self.ctx.timeout.max(Duration::from_secs(600)),
            self.ctx.retries.max(1),
        )
        .await?;
        Ok(())
    }

    /// The embedded release string, from `<image> --version`.
    async fn image_release(&self) -> Result<String> {
        let argv = vec![
            self.ctx.runtime.binary_str(),
            "run".to_string(),
            "--rm".to_string(),
            self.ctx.image.clone(),
            "--version".to_string(),
        ];
        let out =
            call_checked(self.services.engine.as_ref(), &argv, self.ctx.timeout).await?;
        parse_release(&out.stdout)
    }

    async fn keytool_key(&self) -> Result<String> {
        let args = vec!["--gen-print-key".to_string()];
        let argv = one_shot_cmd(
            &self.ctx.runtime,
            &self.ctx.image,
            Some("/usr/bin/silo-authtool"),
            &args,
            &[],
            &[],
        );
        let out =
            call_checked(self.services.engine.as_ref(), &argv, self.ctx.timeout).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn make_monmap(
        &self,
        cluster: &ClusterId,
        mon_id: &str,
        addrv: &AddrVec,
        tmp_dir: &Path,
    ) -> Result<()> {
        let args = vec![
            "--create".to_string(),
            "--clobber".to_string(),
            "--fsid".to_string(),
            cluster.to_string(),
            "--addv".to_string(),
            mon_id.to_string(),
            addrv.to_string(),
            "-o".to_string(),
            "/work/monmap".to_string(),
        ];
        let volumes = vec![format!("{}:/work:z", tmp_dir.display())];
        let argv = one_shot_cmd(
            &self.ctx.runtime,
            &self.ctx.image,
            Some("/usr/bin/silo-monmaptool"),
            &args,
            &volumes,
            &[],
        );
        call_checked(self.services.engine.as_ref(), &argv, self.ctx.timeout).await?;
        Ok(())
    }

    /// Ready when `mgr stat` reports an available manager; `mgr dump`
    /// with an active name is the fallback for older monitors.
    async fn wait_for_mgr(&self, cli: &AdminCli<'_>, opts: &BootstrapOptions) -> Result<()> {
        for attempt in 1..=opts.retries.max(1) {
            if let Ok(out) = cli.run(&["mgr", "stat"]).await {
                if let Ok(value) = serde_json::from_str::<Value>(&out.stdout) {
                    if value.get("available").and_then(Value::as_bool) == Some(true) {
                        return Ok(());
                    }
                }
            }
            if let Ok(out) = cli.run(&["mgr", "dump"]).await {
                if let Ok(value) = serde_json::from_str::<Value>(&out.stdout) {
                    if value
                        .get("active_name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| !name.is_empty())
                    {
                        return Ok(());
                    }
                }
            }
            debug!(attempt, "manager not ready yet");
            if attempt < opts.retries {
                tokio::time::sleep(opts.retry_delay).await;
            }
        }
        Err(Error::InvalidArgs("manager never became available".into()))
    }

    async fn prepare_ssh(
        &self,
        opts: &BootstrapOptions,
        cluster: &ClusterId,
        cli: &AdminCli<'_>,
        tmp_dir: &Path,
        ssh_key_out: &Path,
    ) -> Result<()> {
        let key_path = tmp_dir.join("ssh_identity");
        let pub_path = tmp_dir.join("ssh_identity.pub");
        if !key_path.exists() {
            let argv = vec![
                "ssh-keygen".to_string(),
                "-t".to_string(),
                "ed25519".to_string(),
                "-N".to_string(),
                String::new(),
                "-f".to_string(),
                key_path.display().to_string(),
            ];
            exec::run_checked(&argv, self.ctx.timeout).await?;
        }
        let public = std::fs::read_to_string(&pub_path)?;
        layout::write_file(ssh_key_out, public.as_bytes(), 0o644, None)?;

        cli.run(&["config-key", "set", "mgr/silo/ssh_identity_key", "-i", "/work/ssh_identity"])
            .await?;
        cli.run(&["config-key", "set", "mgr/silo/ssh_identity_pub", "-i", "/work/ssh_identity.pub"])
            .await?;

        append_authorized_key(&opts.ssh_user, public.trim(), cluster)?;
        Ok(())
    }

    async fn prepare_dashboard(
        &self,
        opts: &BootstrapOptions,
        cli: &AdminCli<'_>,
        tmp_dir: &Path,
    ) -> Result<()> {
        cli.run(&["mgr", "module", "enable", "dashboard"]).await?;
        match (&opts.dashboard_crt, &opts.dashboard_key) {
            (Some(crt), Some(key)) => {
                std::fs::copy(crt, tmp_dir.join("dashboard.crt"))?;
                std::fs::copy(key, tmp_dir.join("dashboard.key"))?;
                cli.run(&["config-key", "set", "mgr/dashboard/crt", "-i", "/work/dashboard.crt"])
                    .await?;
                cli.run(&["config-key", "set", "mgr/dashboard/key", "-i", "/work/dashboard.key"])
                    .await?;
            }
            _ => {
                cli.run(&["dashboard", "create-self-signed-cert"]).await?;
            }
        }
        let port = opts.dashboard_port.unwrap_or(8443);
        let port_str = port.to_string();
        cli.run(&["config", "set", "mgr", "mgr/dashboard/ssl_server_port", port_str.as_str()]).await?;

        let password = opts.dashboard_password.clone().unwrap_or_else(|| random_lowercase(10));
        layout::write_file(&tmp_dir.join("dashboard_pass"), password.as_bytes(), FILE_MODE, None)?;
        cli.run(&[
            "dashboard",
            "ac-user-create",
            opts.dashboard_user.as_str(),
            "-i",
            "/work/dashboard_pass",
            "administrator",
        ])
        .await?;

        self.services.firewall.open_ports(&[port]).await;
        self.services.firewall.apply().await;
        info!(user = %opts.dashboard_user, password = %password, port, "dashboard user created");
        Ok(())
    }

    /// Validate and apply a service spec file through the restricted
    /// parser, one `orch apply` for the whole document set.
    async fn apply_spec(&self, spec: &Path, cli: &AdminCli<'_>, tmp_dir: &Path) -> Result<()> {
        let content = std::fs::read_to_string(spec)?;
        let docs = yamlspec::parse_docs(&content);
        if docs.is_empty() {
            return Err(Error::InvalidArgs(format!(
                "spec file {} holds no service documents",
                spec.display()
            )));
        }
        for doc in &docs {
            let service = doc.get("service_type").map(String::as_str).unwrap_or("<unknown>");
            info!(service, "applying service spec");
        }
        layout::write_file(&tmp_dir.join("spec.yml"), content.as_bytes(), FILE_MODE, None)?;
        cli.run(&["orch", "apply", "-i", "/work/spec.yml"]).await?;
        Ok(())
    }
}

fn random_lowercase(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// `silo version 17.2.6 basalt` -> `basalt`.
fn parse_release(version_out: &str) -> Result<String> {
    let tokens: Vec<&str> = version_out.split_whitespace().collect();
    let release = tokens
        .iter()
        .position(|t| *t == "version")
        .and_then(|pos| tokens.get(pos + 2))
        .or_else(|| tokens.last())
        .map(|t| t.trim_matches(|c| c == '(' || c == ')').to_string())
        .filter(|t| !t.is_empty());
    release.ok_or_else(|| {
        Error::InvalidArgs(format!("unparseable image version output {version_out:?}"))
    })
}

/// Append a public key with newline hygiene: inspect the file's last
/// byte and only insert a separator when one is missing.
fn append_authorized_key(user: &str, public_key: &str, cluster: &ClusterId) -> Result<()> {
    let home = if user == "root" {
        PathBuf::from("/root")
    } else {
        PathBuf::from("/home").join(user)
    };
    let ssh_dir = home.join(".ssh");
    layout::makedirs(&ssh_dir, 0o700, None)?;
    let auth_path = ssh_dir.join("authorized_keys");
    let mut content = std::fs::read(&auth_path).unwrap_or_default();
    if !content.is_empty() && content.last() != Some(&b'\n') {
        content.push(b'\n');
    }
    content.extend_from_slice(format!("{public_key} siloadm-{cluster}\n").as_bytes());
    layout::write_file(&auth_path, &content, 0o600, None)?;
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
