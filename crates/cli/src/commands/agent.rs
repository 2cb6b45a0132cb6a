// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm agent` - the persistent per-host agent

use std::sync::Arc;

use clap::Args;
use silo_agent::{run_agent, AgentOptions};
use silo_core::cluster::ClusterId;
use silo_engine::Engine;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Args)]
pub struct AgentArgs {
    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// This agent's instance id within the cluster
    #[arg(long)]
    pub daemon_id: String,
}

pub async fn agent(engine: Engine, args: AgentArgs) -> anyhow::Result<()> {
    let options = AgentOptions {
        cluster: ClusterId::parse(&args.fsid)?,
        daemon_id: args.daemon_id,
    };
    let stop = CancellationToken::new();

    // SIGTERM from systemd and Ctrl-C both stop the agent cleanly.
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(sigterm) => sigterm,
            Err(_) => return,
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("stop signal received");
        signal_stop.cancel();
    });

    run_agent(Arc::new(engine), options, stop).await?;
    Ok(())
}
