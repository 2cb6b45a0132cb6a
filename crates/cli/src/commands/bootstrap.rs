// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm bootstrap` - single-host cluster genesis

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use silo_core::cluster::ClusterId;
use silo_engine::{BootstrapOptions, Engine};

#[derive(Args)]
pub struct BootstrapArgs {
    /// Cluster id; generated when omitted
    #[arg(long)]
    pub fsid: Option<String>,

    /// Monitor address: IP, IP:port, or a bracketed address vector
    #[arg(long)]
    pub mon_ip: Option<String>,

    /// Cluster (replication) network CIDRs, comma separated
    #[arg(long)]
    pub cluster_network: Option<String>,

    /// Do not infer the public network from the route table
    #[arg(long)]
    pub skip_mon_network: bool,

    #[arg(long)]
    pub skip_pull: bool,

    #[arg(long)]
    pub skip_ssh: bool,

    #[arg(long)]
    pub skip_dashboard: bool,

    /// Reuse existing output files
    #[arg(long)]
    pub allow_overwrite: bool,

    /// Accept an image whose release differs from this build's
    #[arg(long)]
    pub allow_mismatched_release: bool,

    #[arg(long)]
    pub output_config: Option<PathBuf>,

    #[arg(long)]
    pub output_keyring: Option<PathBuf>,

    #[arg(long)]
    pub output_pub_ssh_key: Option<PathBuf>,

    /// Config file assimilated into the new cluster
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "root")]
    pub ssh_user: String,

    #[arg(long)]
    pub dashboard_port: Option<u16>,

    #[arg(long, default_value = "admin")]
    pub initial_dashboard_user: String,

    #[arg(long)]
    pub initial_dashboard_password: Option<String>,

    #[arg(long)]
    pub dashboard_crt: Option<PathBuf>,

    #[arg(long)]
    pub dashboard_key: Option<PathBuf>,

    /// Service spec applied after the cluster is up
    #[arg(long)]
    pub apply_spec: Option<PathBuf>,

    /// Attempts for the monitor/manager wait loops
    #[arg(long, default_value = "15")]
    pub wait_retries: u32,

    /// Sleep between wait attempts, seconds
    #[arg(long, default_value = "2")]
    pub wait_delay: u64,
}

pub async fn bootstrap(engine: &Engine, args: BootstrapArgs) -> anyhow::Result<()> {
    let options = BootstrapOptions {
        cluster: args.fsid.as_deref().map(ClusterId::parse).transpose()?,
        mon_ip: args.mon_ip,
        cluster_network: args.cluster_network,
        skip_mon_network: args.skip_mon_network,
        skip_pull: args.skip_pull,
        skip_ssh: args.skip_ssh,
        skip_dashboard: args.skip_dashboard,
        allow_overwrite: args.allow_overwrite,
        allow_mismatched_release: args.allow_mismatched_release,
        output_config: args.output_config,
        output_keyring: args.output_keyring,
        output_pub_ssh_key: args.output_pub_ssh_key,
        initial_config: args.config,
        ssh_user: args.ssh_user,
        dashboard_port: args.dashboard_port,
        dashboard_user: args.initial_dashboard_user,
        dashboard_password: args.initial_dashboard_password,
        dashboard_crt: args.dashboard_crt,
        dashboard_key: args.dashboard_key,
        apply_spec: args.apply_spec,
        retries: args.wait_retries,
        retry_delay: Duration::from_secs(args.wait_delay),
    };
    engine.bootstrap(&options).await?;
    println!("bootstrap complete");
    Ok(())
}
