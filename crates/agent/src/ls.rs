// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon-listing gatherer.
//!
//! A full listing is expensive; between full listings the producer runs
//! the cheap per-daemon subset (enabled, state, container id, memory)
//! and merges it into the cache. The key set or a container id changing
//! forces the next full listing.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use silo_core::cluster::ClusterId;
use silo_core::error::Result;
use silo_engine::{DaemonEntry, Engine, QuickStatus};

use crate::gather::Producer;

struct LsCache {
    entries: Vec<DaemonEntry>,
    quick: BTreeMap<String, QuickStatus>,
}

pub struct LsProducer {
    engine: Arc<Engine>,
    cluster: ClusterId,
    cache: Mutex<Option<LsCache>>,
}

impl LsProducer {
    pub fn new(engine: Arc<Engine>, cluster: ClusterId) -> Self {
        Self { engine, cluster, cache: Mutex::new(None) }
    }

    async fn full_listing(&self) -> Result<(Value, bool)> {
        let cluster_str = self.cluster.to_string();
        let entries: Vec<DaemonEntry> = self
            .engine
            .list_daemons()
            .await?
            .into_iter()
            .filter(|e| e.cluster.as_deref() == Some(cluster_str.as_str()))
            .collect();
        let quick = self.engine.quick_status(&self.cluster).await?;
        let value = serde_json::to_value(&entries)?;
        *self.cache.lock() = Some(LsCache { entries, quick });
        Ok((value, true))
    }
}

#[async_trait::async_trait]
impl Producer for LsProducer {
    fn name(&self) -> &'static str {
        "ls"
    }

    async fn produce(&self) -> Result<(Value, bool)> {
        if self.cache.lock().is_none() {
            return self.full_listing().await;
        }
        let quick = self.engine.quick_status(&self.cluster).await?;

        // A daemon appearing, disappearing or getting a new container
        // invalidates the cheap merge.
        let needs_full = {
            let cache = self.cache.lock();
            match cache.as_ref() {
                // Only this task writes the cache; treat a vanished one
                // like a first run.
                None => true,
                Some(cached) => {
                    let keys_differ = cached.quick.keys().ne(quick.keys());
                    let container_changed = quick.iter().any(|(name, status)| {
                        cached
                            .quick
                            .get(name)
                            .is_some_and(|old| old.container_id != status.container_id)
                    });
                    keys_differ || container_changed
                }
            }
        };
        if needs_full {
            return self.full_listing().await;
        }

        // Merge the subset into the cached entries.
        let mut cache = self.cache.lock();
        let Some(cached) = cache.as_mut() else { return Ok((Value::Null, false)) };
        let mut changed = false;
        for entry in &mut cached.entries {
            if let Some(status) = quick.get(&entry.name) {
                if entry.enabled != status.enabled || entry.state != status.state {
                    changed = true;
                }
                entry.enabled = status.enabled;
                entry.state = status.state.clone();
                entry.container_id = status.container_id.clone();
                entry.memory_usage = status.memory_usage;
            }
        }
        cached.quick = quick;
        let value = serde_json::to_value(&cached.entries)?;
        Ok((value, changed))
    }
}

#[cfg(test)]
#[path = "ls_tests.rs"]
mod tests;
