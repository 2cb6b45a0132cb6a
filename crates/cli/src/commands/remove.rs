// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm rm-daemon` / `rm-cluster` / `zap-osds`

use clap::Args;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::error::Error;
use silo_engine::Engine;

#[derive(Args)]
pub struct RmDaemonArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// Required for monitor and object-store daemons
    #[arg(long)]
    pub force: bool,

    /// Delete the data dir even for kinds that normally get a backup
    #[arg(long)]
    pub force_delete_data: bool,
}

#[derive(Args)]
pub struct RmClusterArgs {
    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// Acknowledge that every daemon of this cluster will be destroyed
    #[arg(long)]
    pub force: bool,

    /// Destroy this cluster's OSD devices as well
    #[arg(long)]
    pub zap_osds: bool,

    /// Leave the cluster's log directory in place
    #[arg(long)]
    pub keep_logs: bool,
}

#[derive(Args)]
pub struct ZapOsdsArgs {
    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// Acknowledge that the devices will be wiped
    #[arg(long)]
    pub force: bool,
}

pub async fn rm_daemon(engine: &Engine, args: RmDaemonArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;
    engine.remove_daemon(&cluster, &daemon, args.force, args.force_delete_data).await?;
    Ok(())
}

pub async fn rm_cluster(engine: &Engine, args: RmClusterArgs) -> anyhow::Result<()> {
    if !args.force {
        return Err(Error::InvalidArgs(
            "rm-cluster destroys all cluster state on this host; pass --force to proceed".into(),
        )
        .into());
    }
    let cluster = ClusterId::parse(&args.fsid)?;
    engine.remove_cluster(&cluster, args.zap_osds, args.keep_logs).await?;
    Ok(())
}

pub async fn zap_osds(engine: &Engine, args: ZapOsdsArgs) -> anyhow::Result<()> {
    if !args.force {
        return Err(Error::InvalidArgs(
            "zap-osds wipes storage devices; pass --force to proceed".into(),
        )
        .into());
    }
    let cluster = ClusterId::parse(&args.fsid)?;
    engine.zap_osds(&cluster).await?;
    Ok(())
}
