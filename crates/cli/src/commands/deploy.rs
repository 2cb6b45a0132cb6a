// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm deploy` - deploy, redeploy or reconfigure one daemon

use clap::Args;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::config::DeployConfig;
use silo_core::error::Error;
use silo_engine::{DeployRequest, Engine};

#[derive(Args)]
pub struct DeployArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// Path to a config file materialized as `config`
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Structured config blob: inline JSON or a file path
    #[arg(long)]
    pub config_json: Option<String>,

    /// Path to a keyring file materialized as `keyring`
    #[arg(long)]
    pub keyring: Option<std::path::PathBuf>,

    /// Bare key; wrapped into a minimal keyring when none is given
    #[arg(long)]
    pub key: Option<String>,

    /// OSD volume fsid (object-store kind only)
    #[arg(long)]
    pub osd_fsid: Option<String>,

    /// Space-separated TCP ports to claim and open
    #[arg(long)]
    pub tcp_ports: Option<String>,

    /// Regenerate config for an existing daemon
    #[arg(long)]
    pub reconfig: bool,

    /// Allow SYS_PTRACE in the daemon container
    #[arg(long)]
    pub allow_ptrace: bool,

    #[arg(long)]
    pub memory_request: Option<u64>,

    #[arg(long)]
    pub memory_limit: Option<u64>,

    /// Deploy-time metadata blob persisted into `unit.meta`
    #[arg(long)]
    pub meta_json: Option<String>,
}

/// `--config-json` accepts inline JSON or a file path.
pub(crate) fn read_json_blob(input: &str) -> anyhow::Result<String> {
    if input.trim_start().starts_with('{') {
        Ok(input.to_string())
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

pub(crate) fn parse_ports(input: &str) -> anyhow::Result<Vec<u16>> {
    input
        .split_whitespace()
        .map(|p| {
            p.parse::<u16>()
                .map_err(|_| Error::InvalidArgs(format!("{p:?} is not a TCP port")).into())
        })
        .collect()
}

pub async fn deploy(engine: &Engine, args: DeployArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;

    let mut config = match &args.config_json {
        Some(blob) => DeployConfig::from_json(&read_json_blob(blob)?)?,
        None => DeployConfig::default(),
    };
    if let Some(path) = &args.config {
        config.files.insert("config".to_string(), std::fs::read_to_string(path)?);
    }
    if let Some(path) = &args.keyring {
        config.files.insert("keyring".to_string(), std::fs::read_to_string(path)?);
    }
    if let Some(key) = &args.key {
        config
            .files
            .entry("keyring".to_string())
            .or_insert_with(|| format!("[{}]\n\tkey = {key}\n", args.name));
    }
    if let Some(ports) = &args.tcp_ports {
        config.ports = parse_ports(ports)?;
    }
    if args.memory_request.is_some() {
        config.memory_request = args.memory_request;
    }
    if args.memory_limit.is_some() {
        config.memory_limit = args.memory_limit;
    }
    if let Some(meta) = &args.meta_json {
        config.meta = serde_json::from_str(&read_json_blob(meta)?)?;
    }

    let mut request = DeployRequest::new(cluster, daemon);
    request.config = config;
    request.reconfig = args.reconfig;
    request.allow_ptrace = args.allow_ptrace;
    request.osd_fsid = args.osd_fsid.clone();
    engine.deploy(&request).await?;
    Ok(())
}

#[cfg(test)]
#[path = "deploy_tests.rs"]
mod tests;
