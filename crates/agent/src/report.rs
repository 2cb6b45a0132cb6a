// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reporter: one HTTPS POST of the host snapshot per tick.

use std::path::Path;

use serde_json::{json, Value};
use silo_core::error::{Error, Result};

use crate::config;

/// HTTPS client pinned to the manager's CA; server hostname
/// verification stays on.
pub fn build_client(data_dir: &Path) -> Result<reqwest::Client> {
    let root_pem = std::fs::read(data_dir.join(config::ROOT_CERT_FILE))
        .map_err(|e| Error::InvalidConfig { which: format!("root cert: {e}") })?;
    let root = reqwest::Certificate::from_pem(&root_pem)
        .map_err(|e| Error::InvalidConfig { which: format!("root cert: {e}") })?;
    reqwest::Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(root)
        .build()
        .map_err(|e| Error::InvalidConfig { which: format!("reporter TLS: {e}") })
}

/// The snapshot document POSTed to `/data`.
#[allow(clippy::too_many_arguments)]
pub fn snapshot(
    host: &str,
    ls: Option<Value>,
    networks: Value,
    facts: Value,
    volume: Option<Value>,
    ack: u64,
    keyring: &str,
    port: u16,
) -> Value {
    json!({
        "host": host,
        "ls": ls,
        "networks": networks,
        "facts": facts,
        "volume": volume,
        "ack": ack,
        "keyring": keyring,
        "port": port,
    })
}

/// POST one snapshot. Network failures are the caller's to log; the
/// loop never stops because the manager was away.
pub async fn post(client: &reqwest::Client, url: &str, body: &Value) -> Result<()> {
    client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::InvalidArgs(format!("POST {url}: {e}")))?
        .error_for_status()
        .map_err(|e| Error::InvalidArgs(format!("POST {url}: {e}")))?;
    Ok(())
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
