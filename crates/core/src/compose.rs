// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container command composer.
//!
//! Turns a daemon description plus runtime context into concrete argument
//! vectors for `run`, `stop`, `rm` and `exec`. Pure: nothing here touches
//! the filesystem or spawns a process; failures are deferred to whoever
//! executes the produced vectors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cluster::{ClusterId, DaemonId};
use crate::error::{Error, Result};

/// Container runtime family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Podman,
    Docker,
}

/// Parsed `<runtime> --version` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuntimeVersion(pub u32, pub u32, pub u32);

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl FromStr for RuntimeVersion {
    type Err = Error;

    /// Accepts a bare `x.y[.z]` triple or a full `--version` line such as
    /// `podman version 3.4.1` or `Docker version 20.10.12, build e91ed57`.
    fn from_str(s: &str) -> Result<Self> {
        let token = s
            .split_whitespace()
            .find(|t| t.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .ok_or_else(|| Error::InvalidArgs(format!("no version in {s:?}")))?
            .trim_end_matches(',');
        let mut parts = token.split('.').map(|p| {
            p.chars().take_while(|c| c.is_ascii_digit()).collect::<String>().parse::<u32>()
        });
        let major = parts
            .next()
            .and_then(|r| r.ok())
            .ok_or_else(|| Error::InvalidArgs(format!("bad version token {token:?}")))?;
        let minor = parts.next().and_then(|r| r.ok()).unwrap_or(0);
        let patch = parts.next().and_then(|r| r.ok()).unwrap_or(0);
        Ok(RuntimeVersion(major, minor, patch))
    }
}

/// The container runtime the engine drives.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub kind: RuntimeKind,
    pub binary: PathBuf,
    pub version: Option<RuntimeVersion>,
}

/// Podman learned split cgroups and conmon pid files here; older
/// releases get simple units.
const SPLIT_CGROUPS_SINCE: RuntimeVersion = RuntimeVersion(2, 1, 0);

impl RuntimeInfo {
    pub fn new(kind: RuntimeKind, binary: impl Into<PathBuf>) -> Self {
        Self { kind, binary: binary.into(), version: None }
    }

    pub fn with_version(mut self, version: RuntimeVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn binary_str(&self) -> String {
        self.binary.display().to_string()
    }

    /// True when the runtime should run daemons detached with split
    /// cgroups and a forking service unit.
    pub fn forking_units(&self) -> bool {
        self.kind == RuntimeKind::Podman
            && self.version.is_some_and(|v| v >= SPLIT_CGROUPS_SINCE)
    }
}

/// How the service unit must drive the composed run command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStyle {
    pub forking: bool,
    pub pid_file: Option<PathBuf>,
    pub cid_file: Option<PathBuf>,
}

/// Canonical container name: dots become dashes because the runtime may
/// propagate dotted names into the container's /etc/hosts, confusing
/// fqdn lookups inside.
pub fn container_name(cluster: &ClusterId, daemon: &DaemonId) -> String {
    legacy_container_name(cluster, daemon).replace('.', "-")
}

/// The dotted name used by earlier releases; stop/remove address it too.
pub fn legacy_container_name(cluster: &ClusterId, daemon: &DaemonId) -> String {
    format!("svc-{}-{}", cluster, daemon)
}

/// Instantiated unit name for a daemon, `silo-<cluster>@<kind>.<id>.service`.
pub fn service_name(cluster: &ClusterId, daemon: &DaemonId) -> String {
    format!("silo-{cluster}@{daemon}.service")
}

/// Environment variable instructing the daemon to derive per-run nonces
/// randomly instead of from the container id; set whenever the container
/// runs under `--init`.
pub const RANDOM_NONCE_ENV: &str = "SILO_USE_RANDOM_NONCE=1";

/// A fully described long-running daemon container.
#[derive(Debug, Clone)]
pub struct Composer<'a> {
    pub runtime: &'a RuntimeInfo,
    pub cluster: &'a ClusterId,
    pub daemon: &'a DaemonId,
    pub image: String,
    pub entrypoint: Option<String>,
    /// Arguments after the entrypoint.
    pub args: Vec<String>,
    /// Extra runtime flags supplied by the descriptor or caller.
    pub container_args: Vec<String>,
    /// KEY=VALUE pairs.
    pub envs: Vec<String>,
    /// host:container[:options] volume specs.
    pub volumes: Vec<String>,
    pub privileged: bool,
    pub ptrace: bool,
    pub init: bool,
    /// Cleared only by descriptors that bring their own network config.
    pub host_network: bool,
    pub memory_limit: Option<u64>,
    /// Directory for conmon pid/cid files when units are forking.
    pub run_dir: PathBuf,
}

impl<'a> Composer<'a> {
    pub fn new(
        runtime: &'a RuntimeInfo,
        cluster: &'a ClusterId,
        daemon: &'a DaemonId,
        image: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            cluster,
            daemon,
            image: image.into(),
            entrypoint: None,
            args: Vec::new(),
            container_args: Vec::new(),
            envs: Vec::new(),
            volumes: Vec::new(),
            privileged: false,
            ptrace: false,
            init: false,
            host_network: true,
            memory_limit: None,
            run_dir: PathBuf::from("/run"),
        }
    }

    pub fn container_name(&self) -> String {
        container_name(self.cluster, self.daemon)
    }

    pub fn legacy_container_name(&self) -> String {
        legacy_container_name(self.cluster, self.daemon)
    }

    pub fn service_name(&self) -> String {
        service_name(self.cluster, self.daemon)
    }

    fn pid_file(&self) -> PathBuf {
        self.run_dir.join(format!("{}-pid", self.service_name()))
    }

    fn cid_file(&self) -> PathBuf {
        self.run_dir.join(format!("{}-cid", self.service_name()))
    }

    /// How the unit must be written for this runtime.
    pub fn unit_style(&self) -> UnitStyle {
        if self.runtime.forking_units() {
            UnitStyle {
                forking: true,
                pid_file: Some(self.pid_file()),
                cid_file: Some(self.cid_file()),
            }
        } else {
            UnitStyle { forking: false, pid_file: None, cid_file: None }
        }
    }

    /// The long-running `run` invocation, starting with the runtime binary.
    pub fn run_cmd(&self) -> ComposedRun {
        let mut argv = vec![self.runtime.binary_str(), "run".to_string()];
        argv.push("--rm".to_string());
        argv.push("--ipc=host".to_string());
        argv.push("--stop-signal=SIGTERM".to_string());
        if self.host_network {
            argv.push("--net=host".to_string());
        }
        if self.init {
            argv.push("--init".to_string());
            argv.push("-e".to_string());
            argv.push(RANDOM_NONCE_ENV.to_string());
        }
        if self.runtime.forking_units() {
            argv.push("--cgroups=split".to_string());
            argv.push("-d".to_string());
            argv.push("--conmon-pidfile".to_string());
            argv.push(self.pid_file().display().to_string());
            argv.push("--cidfile".to_string());
            argv.push(self.cid_file().display().to_string());
        }
        if self.privileged {
            // Privileged already grants every capability; disk group
            // membership is still explicit for device nodes.
            argv.push("--privileged".to_string());
            argv.push("--group-add=disk".to_string());
        } else if self.ptrace {
            argv.push("--cap-add=SYS_PTRACE".to_string());
        }
        if let Some(limit) = self.memory_limit {
            argv.push(format!("--memory={limit}b"));
        }
        argv.push("--name".to_string());
        argv.push(self.container_name());
        for env in &self.envs {
            argv.push("-e".to_string());
            argv.push(env.clone());
        }
        for vol in &self.volumes {
            argv.push("-v".to_string());
            argv.push(vol.clone());
        }
        if let Some(ep) = &self.entrypoint {
            argv.push("--entrypoint".to_string());
            argv.push(ep.clone());
        }
        for extra in &self.container_args {
            argv.push(extra.clone());
        }
        argv.push(self.image.clone());
        argv.extend(self.args.iter().cloned());
        ComposedRun { argv, style: self.unit_style() }
    }

    /// `stop` invocations for both remembered names, canonical first.
    /// Absence of either container is not an error for the invoker.
    pub fn stop_cmds(&self) -> Vec<Vec<String>> {
        self.both_names()
            .into_iter()
            .map(|name| vec![self.runtime.binary_str(), "stop".to_string(), name])
            .collect()
    }

    /// `rm --force` invocations for both remembered names.
    pub fn rm_cmds(&self) -> Vec<Vec<String>> {
        self.both_names()
            .into_iter()
            .map(|name| {
                vec![self.runtime.binary_str(), "rm".to_string(), "--force".to_string(), name]
            })
            .collect()
    }

    /// `exec` into the canonical container.
    pub fn exec_cmd(&self, cmd: &[String]) -> Vec<String> {
        let mut argv =
            vec![self.runtime.binary_str(), "exec".to_string(), "-i".to_string()];
        argv.push(self.container_name());
        argv.extend(cmd.iter().cloned());
        argv
    }

    fn both_names(&self) -> Vec<String> {
        let canonical = self.container_name();
        let legacy = self.legacy_container_name();
        if canonical == legacy {
            vec![canonical]
        } else {
            vec![canonical, legacy]
        }
    }
}

/// A composed `run` invocation plus the unit style it implies.
#[derive(Debug, Clone)]
pub struct ComposedRun {
    pub argv: Vec<String>,
    pub style: UnitStyle,
}

/// A transient one-shot invocation: `--rm`, no name retention, used for
/// keytool/monmaptool/stat style helpers. Must leave no state behind.
pub fn one_shot_cmd(
    runtime: &RuntimeInfo,
    image: &str,
    entrypoint: Option<&str>,
    args: &[String],
    volumes: &[String],
    envs: &[String],
) -> Vec<String> {
    let mut argv = vec![runtime.binary_str(), "run".to_string(), "--rm".to_string()];
    argv.push("--ipc=host".to_string());
    argv.push("--net=host".to_string());
    for env in envs {
        argv.push("-e".to_string());
        argv.push(env.clone());
    }
    for vol in volumes {
        argv.push("-v".to_string());
        argv.push(vol.clone());
    }
    if let Some(ep) = entrypoint {
        argv.push("--entrypoint".to_string());
        argv.push(ep.to_string());
    }
    argv.push(image.to_string());
    argv.extend(args.iter().cloned());
    argv
}

/// One-shot `stat %u %g` probe for a path inside the image.
pub fn stat_cmd(runtime: &RuntimeInfo, image: &str, path: &Path) -> Vec<String> {
    let args = vec!["-c".to_string(), "%u %g".to_string(), path.display().to_string()];
    one_shot_cmd(runtime, image, Some("stat"), &args, &[], &[])
}

/// Parse the output of the stat probe into a uid/gid pair.
pub fn parse_uid_gid(out: &str) -> Result<(u32, u32)> {
    let mut parts = out.split_whitespace();
    let uid = parts.next().and_then(|p| p.parse().ok());
    let gid = parts.next().and_then(|p| p.parse().ok());
    match (uid, gid) {
        (Some(uid), Some(gid)) => Ok((uid, gid)),
        _ => Err(Error::InvalidArgs(format!("unparseable uid/gid output {out:?}"))),
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
