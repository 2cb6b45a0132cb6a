// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent main loop: wire the listener, the two gatherers and the
//! reporter together and run until stopped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::error::Result;
use silo_core::kind::DaemonKind;
use silo_engine::{gather_facts, list_networks, Engine};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{self, AgentConfig};
use crate::gather::Gatherer;
use crate::listener::{select_listener_port, MgrListener};
use crate::ls::LsProducer;
use crate::report;
use crate::volume::VolumeProducer;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub cluster: ClusterId,
    pub daemon_id: String,
}

/// Run the agent until the stop token fires. The engine handle is the
/// same one the CLI builds; the agent never takes the cluster lock.
pub async fn run_agent(
    engine: Arc<Engine>,
    opts: AgentOptions,
    stop: CancellationToken,
) -> Result<()> {
    let daemon = DaemonId::new(DaemonKind::Agent, opts.daemon_id.clone());
    let data_dir = engine.ctx.layout.daemon_dir(&opts.cluster, &daemon);

    // Config errors are fatal: without a target there is nothing to do.
    let agent_config = match AgentConfig::load(&data_dir) {
        Ok(config) => config,
        Err(e) => {
            stop.cancel();
            return Err(e);
        }
    };
    let keyring = std::fs::read_to_string(data_dir.join(config::KEYRING_FILE))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let port = select_listener_port(agent_config.listener_port)?;
    let interval = Duration::from_secs(agent_config.refresh_period.max(1));

    let reporter_wakeup = Arc::new(Notify::new());
    let ls_wakeup = Arc::new(Notify::new());
    let volume_wakeup = Arc::new(Notify::new());

    let listener = MgrListener::new(
        data_dir.clone(),
        port,
        vec![reporter_wakeup.clone(), ls_wakeup.clone(), volume_wakeup.clone()],
        stop.clone(),
    )?;
    let ack = listener.handler.ack.clone();

    let ls = Arc::new(Gatherer::new(
        Arc::new(LsProducer::new(engine.clone(), opts.cluster.clone())),
        interval,
        ls_wakeup,
        stop.clone(),
    ));
    let volume = Arc::new(Gatherer::new(
        Arc::new(VolumeProducer::new(engine.clone(), agent_config.device_enhanced_scan)),
        interval,
        volume_wakeup,
        stop.clone(),
    ));

    let listener_task = tokio::spawn(async move { listener.run().await });
    let ls_task = {
        let ls = ls.clone();
        tokio::spawn(async move { ls.run().await })
    };
    let volume_task = {
        let volume = volume.clone();
        tokio::spawn(async move { volume.run().await })
    };

    let client = report::build_client(&data_dir)?;
    let url = agent_config.target_url();
    info!(host = %agent_config.host, url = %url, port, "agent started");

    // Reporter on this task: snapshot, POST, adaptive sleep.
    while !stop.is_cancelled() {
        let started = Instant::now();
        let networks = list_networks(engine.ctx.timeout)
            .await
            .map(|map| serde_json::to_value(map).unwrap_or_default())
            .unwrap_or_default();
        let body = report::snapshot(
            &agent_config.host,
            ls.cell.snapshot(),
            networks,
            gather_facts(),
            volume.cell.snapshot(),
            ack.load(std::sync::atomic::Ordering::SeqCst),
            &keyring,
            port,
        );
        if let Err(e) = report::post(&client, &url, &body).await {
            warn!(error = %e, "snapshot push failed");
        }

        let sleep = interval.saturating_sub(started.elapsed());
        tokio::select! {
            _ = tokio::time::sleep(sleep) => {}
            _ = reporter_wakeup.notified() => {}
            _ = stop.cancelled() => break,
        }
    }

    // Stop propagates through the shared token; join what we spawned.
    stop.cancel();
    let _ = listener_task.await;
    let _ = ls_task.await;
    let _ = volume_task.await;
    info!("agent stopped");
    Ok(())
}
