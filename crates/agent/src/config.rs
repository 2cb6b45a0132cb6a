// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration, pushed by the manager into the agent's data dir.

use std::path::Path;

use serde::Deserialize;
use silo_core::error::{Error, Result};

pub const CONFIG_FILE: &str = "agent.json";
pub const KEYRING_FILE: &str = "keyring";
pub const LISTENER_CERT_FILE: &str = "listener.crt";
pub const LISTENER_KEY_FILE: &str = "listener.key";
pub const ROOT_CERT_FILE: &str = "root_cert.pem";

/// Files the listener accepts from a manager push; anything else in a
/// pushed config is ignored.
pub const RECOGNIZED_FILES: &[&str] =
    &[CONFIG_FILE, KEYRING_FILE, LISTENER_CERT_FILE, LISTENER_KEY_FILE, ROOT_CERT_FILE];

/// Where the listener port scan starts when the manager does not pick.
pub const DEFAULT_LISTENER_PORT: u16 = 14873;

const DEFAULT_REFRESH_PERIOD: u64 = 20;

fn default_listener_port() -> u16 {
    DEFAULT_LISTENER_PORT
}

fn default_refresh_period() -> u64 {
    DEFAULT_REFRESH_PERIOD
}

/// Parsed `agent.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Manager endpoint the reporter pushes to.
    pub target_ip: String,
    pub target_port: u16,
    /// Reporter tick, seconds.
    #[serde(default = "default_refresh_period")]
    pub refresh_period: u64,
    /// First candidate port for the push listener.
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
    /// This host's name as the manager knows it.
    pub host: String,
    #[serde(default)]
    pub device_enhanced_scan: bool,
}

impl AgentConfig {
    /// Load from the agent's data dir. Any failure here is fatal to the
    /// agent: without a target there is nothing to do.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::InvalidConfig { which: format!("{}: {e}", path.display()) }
        })?;
        let config: AgentConfig = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidConfig { which: format!("{}: {e}", path.display()) })?;
        Ok(config)
    }

    pub fn target_url(&self) -> String {
        format!("https://{}:{}/data", self.target_ip, self.target_port)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
