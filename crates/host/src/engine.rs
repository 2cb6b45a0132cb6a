// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container engine abstraction.
//!
//! The deploy/adopt/remove engine and the bootstrap orchestrator drive
//! the container runtime exclusively through [`ContainerEngine`], so
//! tests substitute a scripted fake and never need a runtime installed.

use std::time::Duration;

use async_trait::async_trait;
use silo_core::error::{Error, Result};

use crate::exec::{self, CommandOutput};

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Execute one composed runtime invocation, capturing both streams.
    /// Timeouts surface as exit code 124, not as an `Err`.
    async fn call(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput>;
}

/// The real engine: spawns the runtime binary named in `argv[0]`.
#[derive(Debug, Default, Clone)]
pub struct ShellEngine;

#[async_trait]
impl ContainerEngine for ShellEngine {
    async fn call(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput> {
        exec::run(argv, timeout).await
    }
}

/// Checked call: any non-zero exit is an error, 124 a [`Error::ProcessTimeout`].
pub async fn call_checked(
    engine: &dyn ContainerEngine,
    argv: &[String],
    timeout: Duration,
) -> Result<CommandOutput> {
    let out = engine.call(argv, timeout).await?;
    if out.timed_out() {
        return Err(Error::ProcessTimeout { cmd: argv.join(" "), secs: timeout.as_secs() });
    }
    if !out.success() {
        return Err(Error::ProcessFailed {
            cmd: argv.join(" "),
            stdout: out.stdout,
            stderr: out.stderr,
            code: out.code,
        });
    }
    Ok(out)
}

/// Checked call retrying the documented transient runtime failures with
/// doubling backoff. `attempts` counts total tries.
pub async fn call_retry(
    engine: &dyn ContainerEngine,
    argv: &[String],
    timeout: Duration,
    attempts: u32,
) -> Result<CommandOutput> {
    let attempts = attempts.max(1);
    let mut delay = Duration::from_secs(1);
    let mut last = call_checked(engine, argv, timeout).await;
    for _ in 1..attempts {
        match &last {
            Err(Error::ProcessFailed { stderr, .. })
                if exec::is_transient_runtime_error(stderr) =>
            {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            _ => break,
        }
        last = call_checked(engine, argv, timeout).await;
    }
    last
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
