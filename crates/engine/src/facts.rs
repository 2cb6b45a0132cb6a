// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host facts and network listing.
//!
//! The manager treats facts as an opaque JSON document; this producer
//! keeps to cheap /proc reads. Networks come from the route table
//! parsers in silo-core.

use std::time::Duration;

use serde_json::{json, Value};
use silo_core::error::Result;
use silo_core::net::{self, NetworkMap};

use silo_host::exec;

pub fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// A small host-facts document: hostname, kernel, cpu and memory.
pub fn gather_facts() -> Value {
    let kernel = std::fs::read_to_string("/proc/version")
        .map(|s| s.split_whitespace().take(3).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let cpu_count = std::fs::read_to_string("/proc/cpuinfo")
        .map(|s| s.lines().filter(|l| l.starts_with("processor")).count())
        .unwrap_or(0);
    let memory_total_kb = std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("MemTotal:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse::<u64>().ok())
        })
        .unwrap_or(0);
    json!({
        "hostname": hostname(),
        "kernel": kernel,
        "cpu_count": cpu_count,
        "memory_total_kb": memory_total_kb,
    })
}

/// Parse the host route tables into `net -> iface -> addresses`.
pub async fn list_networks(timeout: Duration) -> Result<NetworkMap> {
    let v4_route = cmd_stdout(&["ip", "route", "ls"], timeout).await;
    let mut map = net::parse_ipv4_route(&v4_route);

    let v6_route = cmd_stdout(&["ip", "-6", "route", "ls"], timeout).await;
    let v6_addr = cmd_stdout(&["ip", "-6", "addr", "show"], timeout).await;
    for (net, ifaces) in net::parse_ipv6_route(&v6_route, &v6_addr) {
        map.entry(net).or_default().extend(ifaces);
    }
    Ok(map)
}

async fn cmd_stdout(argv: &[&str], timeout: Duration) -> String {
    let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
    match exec::run(&argv, timeout).await {
        Ok(out) if out.success() => out.stdout,
        _ => String::new(),
    }
}
