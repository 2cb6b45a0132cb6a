// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon ownership resolution.
//!
//! Monitoring components carry a fixed uid/gid pair in the registry;
//! storage daemons learn theirs from a one-shot `stat` inside the image.

use std::path::Path;

use silo_core::compose::{parse_uid_gid, stat_cmd};
use silo_core::config::DeployConfig;
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use silo_core::registry;

use crate::context::Engine;

/// Paths probed inside the image, in order.
const PROBE_PATHS: &[&str] = &["/var/lib/silo", "/var/log/silo"];

impl Engine {
    /// Resolve the uid/gid every artifact of this daemon will be owned
    /// by. Resolution order: caller override, fixed registry pair, image
    /// stat probe.
    pub(crate) async fn resolve_owner(
        &self,
        kind: DaemonKind,
        config: &DeployConfig,
        image: &str,
    ) -> Result<(u32, u32)> {
        if let (Some(uid), Some(gid)) = (config.uid, config.gid) {
            return Ok((uid, gid));
        }
        if let Some(pair) = registry::descriptor(kind).fixed_uid_gid {
            return Ok(pair);
        }
        self.stat_owner_in_image(image).await
    }

    /// Probe the candidate paths; the first failing path names the error
    /// when none works.
    pub(crate) async fn stat_owner_in_image(&self, image: &str) -> Result<(u32, u32)> {
        let mut first_failure: Option<(String, String)> = None;
        for path in PROBE_PATHS {
            let argv = stat_cmd(&self.ctx.runtime, image, Path::new(path));
            match silo_host::engine::call_checked(
                self.services.engine.as_ref(),
                &argv,
                self.ctx.timeout,
            )
            .await
            {
                Ok(out) => {
                    if let Ok(pair) = parse_uid_gid(&out.stdout) {
                        return Ok(pair);
                    }
                    if first_failure.is_none() {
                        first_failure =
                            Some((path.to_string(), format!("unparseable output {:?}", out.stdout)));
                    }
                }
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some((path.to_string(), e.to_string()));
                    }
                }
            }
        }
        let (path, cause) =
            first_failure.unwrap_or_else(|| ("<none>".to_string(), "no paths probed".to_string()));
        Err(Error::InvalidArgs(format!(
            "unable to determine daemon uid/gid from image {image}: stat {path}: {cause}"
        )))
    }
}
