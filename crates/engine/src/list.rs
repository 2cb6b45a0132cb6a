// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon inventory: managed and legacy daemons present on this host.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose;
use silo_core::error::Result;
use silo_core::kind::DaemonKind;
use silo_host::layout;
use tracing::debug;

use crate::context::Engine;

/// One row of `ls` output.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonEntry {
    /// `managed` for container-managed daemons, `legacy` for
    /// package-manager installs not yet adopted.
    pub style: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    pub enabled: bool,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured: Option<String>,
}

/// The cheap per-daemon subset the agent refreshes between full listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickStatus {
    pub enabled: bool,
    pub state: String,
    pub container_id: Option<String>,
    pub memory_usage: Option<u64>,
}

impl Engine {
    /// Enumerate every managed and legacy daemon under the data root.
    pub async fn list_daemons(&self) -> Result<Vec<DaemonEntry>> {
        let (ps, stats) = self.container_index().await;
        let mut entries = Vec::new();

        for cluster in self.ctx.layout.clusters()? {
            for (daemon, dir) in self.ctx.layout.daemon_dirs(&cluster)? {
                entries.push(self.managed_entry(&cluster, &daemon, &dir, &ps, &stats).await);
            }
        }
        entries.extend(self.legacy_entries().await?);
        Ok(entries)
    }

    async fn managed_entry(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        dir: &Path,
        ps: &BTreeMap<String, (String, String)>,
        stats: &BTreeMap<String, u64>,
    ) -> DaemonEntry {
        let unit = compose::service_name(cluster, daemon);
        let container = compose::container_name(cluster, daemon);
        let (container_id, image_name) = match ps.get(&container) {
            Some((id, image)) => (Some(id.clone()), Some(image.clone())),
            None => (None, None),
        };
        DaemonEntry {
            style: "managed".to_string(),
            name: daemon.to_string(),
            cluster: Some(cluster.to_string()),
            enabled: self.services.units.is_enabled(&unit).await,
            state: self.services.units.state(&unit).await.as_str().to_string(),
            container_id,
            container_image_name: image_name,
            memory_usage: stats.get(&container).copied(),
            created: mtime_rfc3339(&dir.join(layout::UNIT_CREATED)),
            configured: mtime_rfc3339(&dir.join(layout::UNIT_CONFIGURED)),
        }
    }

    /// Package-manager daemons live unnamespaced at
    /// `<data-root>/<kind>/silo-<id>`.
    async fn legacy_entries(&self) -> Result<Vec<DaemonEntry>> {
        let mut entries = Vec::new();
        for kind in DaemonKind::ALL {
            let kind_dir = self.ctx.layout.data_root.join(kind.as_str());
            if !kind_dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&kind_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name();
                let Some(id) = name.to_str().and_then(|n| n.strip_prefix("silo-")) else {
                    continue;
                };
                let unit = format!("silo-{kind}@{id}.service");
                entries.push(DaemonEntry {
                    style: "legacy".to_string(),
                    name: format!("{kind}.{id}"),
                    cluster: None,
                    enabled: self.services.units.is_enabled(&unit).await,
                    state: self.services.units.state(&unit).await.as_str().to_string(),
                    container_id: None,
                    container_image_name: None,
                    memory_usage: None,
                    created: None,
                    configured: None,
                });
            }
        }
        Ok(entries)
    }

    /// The agent's cheap pass: one ps plus one stats call for the whole
    /// cluster, merged per daemon.
    pub async fn quick_status(
        &self,
        cluster: &ClusterId,
    ) -> Result<BTreeMap<String, QuickStatus>> {
        let (ps, stats) = self.container_index().await;
        let mut map = BTreeMap::new();
        for (daemon, _) in self.ctx.layout.daemon_dirs(cluster)? {
            let unit = compose::service_name(cluster, &daemon);
            let container = compose::container_name(cluster, &daemon);
            map.insert(
                daemon.to_string(),
                QuickStatus {
                    enabled: self.services.units.is_enabled(&unit).await,
                    state: self.services.units.state(&unit).await.as_str().to_string(),
                    container_id: ps.get(&container).map(|(id, _)| id.clone()),
                    memory_usage: stats.get(&container).copied(),
                },
            );
        }
        Ok(map)
    }

    /// One `ps` call and one `stats` call covering every container.
    async fn container_index(
        &self,
    ) -> (BTreeMap<String, (String, String)>, BTreeMap<String, u64>) {
        let runtime = self.ctx.runtime.binary_str();
        let ps_argv: Vec<String> = vec![
            runtime.clone(),
            "ps".into(),
            "-a".into(),
            "--format".into(),
            "{{.Names}} {{.ID}} {{.Image}}".into(),
        ];
        let mut ps = BTreeMap::new();
        match self.services.engine.call(&ps_argv, self.ctx.timeout).await {
            Ok(out) if out.success() => {
                for line in out.stdout.lines() {
                    let mut fields = line.split_whitespace();
                    if let (Some(name), Some(id)) = (fields.next(), fields.next()) {
                        let image = fields.next().unwrap_or("").to_string();
                        ps.insert(name.to_string(), (id.to_string(), image));
                    }
                }
            }
            Ok(out) => debug!(stderr = %out.stderr.trim(), "container ps failed"),
            Err(e) => debug!(error = %e, "container ps failed"),
        }

        let stats_argv: Vec<String> = vec![
            runtime,
            "stats".into(),
            "--no-stream".into(),
            "--format".into(),
            "{{.Names}} {{.MemUsage}}".into(),
        ];
        let mut stats = BTreeMap::new();
        match self.services.engine.call(&stats_argv, self.ctx.timeout).await {
            Ok(out) if out.success() => {
                for line in out.stdout.lines() {
                    let mut fields = line.split_whitespace();
                    if let (Some(name), Some(mem)) = (fields.next(), fields.next()) {
                        if let Some(bytes) = parse_mem_usage(mem) {
                            stats.insert(name.to_string(), bytes);
                        }
                    }
                }
            }
            Ok(out) => debug!(stderr = %out.stderr.trim(), "container stats failed"),
            Err(e) => debug!(error = %e, "container stats failed"),
        }
        (ps, stats)
    }
}

/// Parse a runtime memory figure like `512MiB` or `1.2GiB` into bytes.
pub(crate) fn parse_mem_usage(s: &str) -> Option<u64> {
    const UNITS: &[(&str, f64)] = &[
        ("KiB", 1024.0),
        ("MiB", 1024.0 * 1024.0),
        ("GiB", 1024.0 * 1024.0 * 1024.0),
        ("kB", 1000.0),
        ("MB", 1000.0 * 1000.0),
        ("GB", 1000.0 * 1000.0 * 1000.0),
        ("B", 1.0),
    ];
    for (suffix, scale) in UNITS {
        if let Some(number) = s.strip_suffix(suffix) {
            let value: f64 = number.parse().ok()?;
            return Some((value * scale) as u64);
        }
    }
    None
}

fn mtime_rfc3339(path: &Path) -> Option<String> {
    let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(mtime).to_rfc3339())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
