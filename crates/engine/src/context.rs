// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration record and collaborator handles.
//!
//! `EngineCtx` is immutable after argument parsing; `Services` carries
//! the pluggable collaborators so tests substitute fakes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use silo_core::compose::RuntimeInfo;
use silo_host::engine::ContainerEngine;
use silo_host::firewall::Firewall;
use silo_host::layout::Layout;
use silo_host::systemd::UnitManager;

/// Host-level directories and runtime options, fixed for the lifetime of
/// one command invocation.
#[derive(Debug, Clone)]
pub struct EngineCtx {
    pub layout: Layout,
    pub unit_dir: PathBuf,
    pub sysctl_dir: PathBuf,
    pub logrotate_dir: PathBuf,
    pub lock_dir: PathBuf,
    /// Host config dir holding the admin config/keyring pair.
    pub config_dir: PathBuf,
    pub runtime: RuntimeInfo,
    pub image: String,
    pub timeout: Duration,
    pub retries: u32,
    /// `--no-container-init` clears this.
    pub container_init: bool,
    /// Extra KEY=VALUE pairs forwarded into every spawned container.
    pub envs: Vec<String>,
}

impl EngineCtx {
    /// Paths a daemon deploy needs to reach the host admin config.
    pub fn admin_config_path(&self) -> PathBuf {
        self.config_dir.join("silo.conf")
    }

    pub fn admin_keyring_path(&self) -> PathBuf {
        self.config_dir.join("silo.client.admin.keyring")
    }
}

/// Pluggable side-effect collaborators.
#[derive(Clone)]
pub struct Services {
    pub engine: Arc<dyn ContainerEngine>,
    pub units: Arc<dyn UnitManager>,
    pub firewall: Arc<dyn Firewall>,
}

/// The engine: one context, one set of collaborators, sequential
/// operations serialized by the per-cluster lock.
pub struct Engine {
    pub ctx: EngineCtx,
    pub services: Services,
}

impl Engine {
    pub fn new(ctx: EngineCtx, services: Services) -> Self {
        Self { ctx, services }
    }
}
