// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured deploy-time configuration supplied by the caller.
//!
//! The engine receives this as the parsed `--config-json` blob plus the
//! flag-level equivalents (`--config`, `--keyring`, `--tcp-ports`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One extra bind mount requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl BindMount {
    /// Render as a `-v` argument value.
    pub fn to_volume_arg(&self) -> String {
        match &self.options {
            Some(opts) => format!("{}:{}:{}", self.source, self.destination, opts),
            None => format!("{}:{}", self.source, self.destination),
        }
    }
}

/// The structured config blob for one daemon deploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Files to materialize under the daemon data dir, name -> content.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Free-form arguments appended to the daemon command line.
    #[serde(default)]
    pub args: Vec<String>,
    /// Declared TCP ports to precheck and open.
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub bind_mounts: Vec<BindMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
    /// Deploy-time metadata persisted verbatim into `unit.meta`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
    /// Kind-specific arguments (e.g. alertmanager `peers`).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Top-level keys of `--config-json` that are file contents rather than
/// entries of the `files` map. Kept for compatibility with the flag form.
const FILE_KEYS: &[&str] = &["config", "keyring"];

impl DeployConfig {
    /// Parse a `--config-json` blob.
    ///
    /// `files` may appear as a nested object; the well-known `config` and
    /// `keyring` top-level strings are folded into it.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(Error::InvalidConfig { which: "config-json must be a JSON object".into() });
        }
        let mut config: DeployConfig = serde_json::from_value(value)?;
        for key in FILE_KEYS {
            if let Some(Value::String(content)) = config.extra.remove(*key) {
                config.files.entry(key.to_string()).or_insert(content);
            }
        }
        Ok(config)
    }

    /// Look up a kind-specific string argument.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Look up a kind-specific list-of-strings argument. A missing key is
    /// an empty list; a scalar string is a one-element list.
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.extra.get(key) {
            Some(Value::Array(items)) => {
                items.iter().filter_map(Value::as_str).map(str::to_string).collect()
            }
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// True when the blob carries the named argument in any form.
    pub fn has_arg(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
