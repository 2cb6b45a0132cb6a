// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error taxonomy for every siloadm operation.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::kind::DaemonKind;

/// Exit code reserved for external command timeouts, matching the shell
/// convention used by `timeout(1)`.
pub const EXIT_TIMEOUT: i32 = 124;

/// Errors surfaced to the user by the engine, bootstrap and agent paths.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("unknown daemon kind {0:?}")]
    UnknownKind(String),

    #[error("daemon kind {kind} cannot be adopted")]
    AdoptUnsupported { kind: DaemonKind },

    #[error("invalid config: {which}")]
    InvalidConfig { which: String },

    #[error("TCP port {port} is already in use")]
    PortBusy { port: u16 },

    #[error("timed out waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf },

    #[error("command {cmd} failed with exit code {code}: {stderr}")]
    ProcessFailed { cmd: String, stdout: String, stderr: String, code: i32 },

    #[error("command {cmd} timed out after {secs}s")]
    ProcessTimeout { cmd: String, secs: u64 },

    #[error("data directory does not exist; deploy the daemon before reconfiguring it")]
    MissingData,

    #[error("removing a {kind} daemon requires --force")]
    DangerousWithoutForce { kind: DaemonKind },

    #[error("image release {found:?} does not match the expected release {expected:?}")]
    ImageReleaseMismatch { expected: String, found: String },

    #[error("unable to find a local network for {addr} on any interface")]
    NetworkInferFailure { addr: IpAddr },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error: 124 for timeouts, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProcessTimeout { .. } => EXIT_TIMEOUT,
            Error::ProcessFailed { code, .. } if *code == EXIT_TIMEOUT => EXIT_TIMEOUT,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
