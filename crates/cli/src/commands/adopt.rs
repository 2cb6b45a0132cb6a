// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm adopt` - take over a package-manager daemon

use clap::Args;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::error::Error;
use silo_engine::{AdoptRequest, Engine};

#[derive(Args)]
pub struct AdoptArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Source layout style; only `legacy` is supported
    #[arg(long, default_value = "legacy")]
    pub style: String,

    /// Cluster id; discovered from the daemon's data when omitted
    #[arg(long)]
    pub fsid: Option<String>,

    /// Start the daemon even if the legacy unit was stopped
    #[arg(long)]
    pub force_start: bool,
}

pub async fn adopt(engine: &Engine, args: AdoptArgs) -> anyhow::Result<()> {
    if args.style != "legacy" {
        return Err(Error::InvalidArgs(format!(
            "unknown adoption style {:?}; only \"legacy\" is supported",
            args.style
        ))
        .into());
    }
    let request = AdoptRequest {
        daemon: DaemonId::parse(&args.name)?,
        cluster: args.fsid.as_deref().map(ClusterId::parse).transpose()?,
        force_start: args.force_start,
    };
    engine.adopt(&request).await?;
    Ok(())
}
