// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The volume-inventory gatherer.
//!
//! Runs the device inventory through a transient container and forwards
//! the raw output; deciding whether anything changed is the manager's
//! job, so the change flag is always false.

use std::sync::Arc;

use serde_json::Value;
use silo_core::compose::one_shot_cmd;
use silo_core::error::Result;
use silo_engine::Engine;

use crate::gather::Producer;

pub struct VolumeProducer {
    engine: Arc<Engine>,
    enhanced: bool,
}

impl VolumeProducer {
    pub fn new(engine: Arc<Engine>, enhanced: bool) -> Self {
        Self { engine, enhanced }
    }
}

#[async_trait::async_trait]
impl Producer for VolumeProducer {
    fn name(&self) -> &'static str {
        "volume"
    }

    async fn produce(&self) -> Result<(Value, bool)> {
        let mut args = vec![
            "inventory".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        if self.enhanced {
            args.push("--with-lsm".to_string());
        }
        let volumes = vec!["/dev:/dev".to_string(), "/run/udev:/run/udev".to_string()];
        let argv = one_shot_cmd(
            &self.engine.ctx.runtime,
            &self.engine.ctx.image,
            Some("/usr/bin/silo-volume"),
            &args,
            &volumes,
            &[],
        );
        let out = silo_host::engine::call_checked(
            self.engine.services.engine.as_ref(),
            &argv,
            self.engine.ctx.timeout,
        )
        .await?;
        Ok((Value::String(out.stdout), false))
    }
}
