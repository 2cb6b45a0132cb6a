// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External process execution with captured streams and a hard timeout.

use std::process::Stdio;
use std::time::Duration;

use silo_core::error::{Error, Result, EXIT_TIMEOUT};
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Captured result of one external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.code == EXIT_TIMEOUT
    }
}

fn display_cmd(argv: &[String]) -> String {
    argv.join(" ")
}

/// Run a command, capturing both streams. A timeout kills the child and
/// yields exit code 124 rather than an error, so callers can decide.
pub async fn run(argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::InvalidArgs("empty command".into()))?;
    debug!(cmd = %display_cmd(argv), "exec");

    let mut child = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Read both pipes concurrently; waiting on the child alone can
    // deadlock once a pipe buffer fills.
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let reader = async {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut stdout).await?;
        }
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut stderr).await?;
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((stdout, stderr, status))
    };

    match tokio::time::timeout(timeout, reader).await {
        Ok(done) => {
            let (stdout, stderr, status) = done?;
            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                code: status.code().unwrap_or(-1),
            })
        }
        Err(_) => {
            debug!(cmd = %display_cmd(argv), secs = timeout.as_secs(), "exec timed out");
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: format!("timed out after {}s", timeout.as_secs()),
                code: EXIT_TIMEOUT,
            })
        }
    }
}

/// Run a command and fail on any non-zero exit, mapping a timeout to
/// [`Error::ProcessTimeout`].
pub async fn run_checked(argv: &[String], timeout: Duration) -> Result<CommandOutput> {
    let out = run(argv, timeout).await?;
    if out.timed_out() {
        return Err(Error::ProcessTimeout { cmd: display_cmd(argv), secs: timeout.as_secs() });
    }
    if !out.success() {
        return Err(Error::ProcessFailed {
            cmd: display_cmd(argv),
            stdout: out.stdout,
            stderr: out.stderr,
            code: out.code,
        });
    }
    Ok(out)
}

/// Stderr patterns the container runtime is known to emit transiently.
/// Everything else fails fast.
const TRANSIENT_STDERR: &[&str] = &[
    // Concurrent pulls racing to create the same layer.
    "error creating read-write layer",
    // Registry TLS handshake running into a slow proxy.
    "net/http: TLS handshake timeout",
    // Registry returning a stale blob.
    "Digest did not match",
];

pub fn is_transient_runtime_error(stderr: &str) -> bool {
    TRANSIENT_STDERR.iter().any(|p| stderr.contains(p))
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
