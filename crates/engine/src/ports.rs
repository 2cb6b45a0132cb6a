// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declared-port precheck.
//!
//! Binds each port on both address families before a deploy claims it.
//! The probe deliberately avoids `SO_REUSEADDR` (the std listener
//! default), so a currently-listening socket always trips it.

use std::net::TcpListener;

use silo_core::cluster::DaemonId;
use silo_core::error::{Error, Result};
use silo_core::kind::DaemonKind;
use tracing::warn;

/// Check that every declared port is free. For the manager kind a busy
/// port is only a warning — a standby manager shares its ports with the
/// active one.
pub fn check_ports(daemon: &DaemonId, ports: &[u16]) -> Result<()> {
    for &port in ports {
        if port_is_free(port) {
            continue;
        }
        if daemon.kind == DaemonKind::Mgr {
            warn!(port, daemon = %daemon, "port in use, assuming standby manager semantics");
            continue;
        }
        return Err(Error::PortBusy { port });
    }
    Ok(())
}

fn port_is_free(port: u16) -> bool {
    // Both families: a daemon may bind either.
    let v4 = TcpListener::bind(("0.0.0.0", port));
    let v6 = TcpListener::bind(("::", port));
    v4.is_ok() && v6.is_ok()
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
