// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic background gatherer.
//!
//! Each gatherer owns a producer, a snapshot cell the reporter reads,
//! and a 3-slot ring of run durations used to keep the effective loop
//! period close to the configured interval. A produce error clears the
//! snapshot but never stops the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use silo_core::error::Result;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DURATION_RING_SLOTS: usize = 3;

/// Whatever a gatherer measures. The second return value reports
/// whether the producer saw a change worth an early manager push.
#[async_trait::async_trait]
pub trait Producer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn produce(&self) -> Result<(Value, bool)>;
}

/// Running mean over the last three iteration durations.
#[derive(Debug, Default)]
pub struct DurationRing {
    slots: [f64; DURATION_RING_SLOTS],
    filled: usize,
    next: usize,
}

impl DurationRing {
    pub fn push(&mut self, secs: f64) {
        self.slots[self.next] = secs;
        self.next = (self.next + 1) % DURATION_RING_SLOTS;
        self.filled = (self.filled + 1).min(DURATION_RING_SLOTS);
    }

    pub fn mean(&self) -> f64 {
        if self.filled == 0 {
            return 0.0;
        }
        self.slots[..self.filled].iter().sum::<f64>() / self.filled as f64
    }
}

/// The snapshot cell plus change flag shared with the reporter.
#[derive(Default)]
pub struct SnapshotCell {
    value: Mutex<Option<Value>>,
}

impl SnapshotCell {
    /// Whole-value replacement; the reporter clones out whatever is
    /// current and the manager dedupes by ack counter.
    pub fn publish(&self, value: Option<Value>) {
        *self.value.lock() = value;
    }

    pub fn snapshot(&self) -> Option<Value> {
        self.value.lock().clone()
    }
}

pub struct Gatherer {
    producer: Arc<dyn Producer>,
    pub cell: Arc<SnapshotCell>,
    pub wakeup: Arc<Notify>,
    interval: Duration,
    stop: CancellationToken,
}

impl Gatherer {
    pub fn new(
        producer: Arc<dyn Producer>,
        interval: Duration,
        wakeup: Arc<Notify>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            producer,
            cell: Arc::new(SnapshotCell::default()),
            wakeup,
            interval,
            stop,
        }
    }

    /// Loop until stopped: produce, publish, sleep the interval minus
    /// the mean run time, or less if woken early.
    pub async fn run(&self) {
        let mut ring = DurationRing::default();
        loop {
            if self.stop.is_cancelled() {
                break;
            }
            let started = Instant::now();
            match self.producer.produce().await {
                Ok((value, changed)) => {
                    self.cell.publish(Some(value));
                    if changed {
                        debug!(gatherer = self.producer.name(), "change detected");
                    }
                }
                Err(e) => {
                    warn!(gatherer = self.producer.name(), error = %e, "produce failed");
                    self.cell.publish(None);
                }
            }
            ring.push(started.elapsed().as_secs_f64());

            let sleep_secs = (self.interval.as_secs_f64() - ring.mean()).max(0.0);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(sleep_secs)) => {}
                _ = self.wakeup.notified() => {
                    debug!(gatherer = self.producer.name(), "woken early");
                }
                _ = self.stop.cancelled() => break,
            }
        }
        debug!(gatherer = self.producer.name(), "stopped");
    }
}

#[cfg(test)]
#[path = "gather_tests.rs"]
mod tests;
