// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host firewall collaborator.
//!
//! Wraps `firewall-cmd`. When the firewall is absent or not running the
//! collaborator degrades to a silent no-op. Mutations are idempotent
//! (query before add/remove) and failures are logged, never fatal — the
//! daemon must come up even when the firewall misbehaves.

use std::time::Duration;

use async_trait::async_trait;
use silo_core::error::Result;
use tracing::{debug, info, warn};

use crate::exec;

#[async_trait]
pub trait Firewall: Send + Sync {
    async fn open_service(&self, service: &str);
    async fn open_ports(&self, ports: &[u16]);
    async fn close_ports(&self, ports: &[u16]);
    /// One reload at the end of a batch of opens/closes.
    async fn apply(&self);
}

/// Detect the host firewall. Absent binary or a non-running state yields
/// the no-op collaborator.
pub async fn detect(timeout: Duration) -> Box<dyn Firewall> {
    let argv = vec!["firewall-cmd".to_string(), "--state".to_string()];
    match exec::run(&argv, timeout).await {
        Ok(out) if out.stdout.trim() == "running" => {
            Box::new(FirewallCmd { timeout })
        }
        Ok(out) => {
            debug!(state = %out.stdout.trim(), "firewall not running, skipping firewall setup");
            Box::new(NoopFirewall)
        }
        Err(e) => {
            debug!(error = %e, "firewall-cmd unavailable, skipping firewall setup");
            Box::new(NoopFirewall)
        }
    }
}

/// The real firewalld wrapper.
#[derive(Debug, Clone)]
pub struct FirewallCmd {
    pub timeout: Duration,
}

impl FirewallCmd {
    async fn cmd(&self, args: &[String]) -> Result<exec::CommandOutput> {
        let argv: Vec<String> =
            std::iter::once("firewall-cmd".to_string()).chain(args.iter().cloned()).collect();
        exec::run(&argv, self.timeout).await
    }

    async fn query(&self, args: &[String]) -> bool {
        match self.cmd(args).await {
            Ok(out) => out.stdout.trim() == "yes",
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Firewall for FirewallCmd {
    async fn open_service(&self, service: &str) {
        let query = vec!["--permanent".to_string(), format!("--query-service={service}")];
        if self.query(&query).await {
            debug!(service, "firewall service already open");
            return;
        }
        let add = vec!["--permanent".to_string(), format!("--add-service={service}")];
        match self.cmd(&add).await {
            Ok(out) if out.success() => info!(service, "opened firewall service"),
            Ok(out) => warn!(service, stderr = %out.stderr.trim(), "failed to open firewall service"),
            Err(e) => warn!(service, error = %e, "failed to open firewall service"),
        }
    }

    async fn open_ports(&self, ports: &[u16]) {
        for port in ports {
            let query = vec!["--permanent".to_string(), format!("--query-port={port}/tcp")];
            if self.query(&query).await {
                debug!(port, "firewall port already open");
                continue;
            }
            let add = vec!["--permanent".to_string(), format!("--add-port={port}/tcp")];
            match self.cmd(&add).await {
                Ok(out) if out.success() => info!(port, "opened firewall port"),
                Ok(out) => warn!(port, stderr = %out.stderr.trim(), "failed to open firewall port"),
                Err(e) => warn!(port, error = %e, "failed to open firewall port"),
            }
        }
    }

    async fn close_ports(&self, ports: &[u16]) {
        for port in ports {
            let query = vec!["--permanent".to_string(), format!("--query-port={port}/tcp")];
            if !self.query(&query).await {
                continue;
            }
            let remove = vec!["--permanent".to_string(), format!("--remove-port={port}/tcp")];
            match self.cmd(&remove).await {
                Ok(out) if out.success() => info!(port, "closed firewall port"),
                Ok(out) => warn!(port, stderr = %out.stderr.trim(), "failed to close firewall port"),
                Err(e) => warn!(port, error = %e, "failed to close firewall port"),
            }
        }
    }

    async fn apply(&self) {
        match self.cmd(&["--reload".to_string()]).await {
            Ok(out) if out.success() => debug!("firewall reloaded"),
            Ok(out) => warn!(stderr = %out.stderr.trim(), "firewall reload failed"),
            Err(e) => warn!(error = %e, "firewall reload failed"),
        }
    }
}

/// Used when no firewall is present; every operation succeeds silently.
#[derive(Debug, Default, Clone)]
pub struct NoopFirewall;

#[async_trait]
impl Firewall for NoopFirewall {
    async fn open_service(&self, _service: &str) {}
    async fn open_ports(&self, _ports: &[u16]) {}
    async fn close_ports(&self, _ports: &[u16]) {}
    async fn apply(&self) {}
}
