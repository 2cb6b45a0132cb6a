// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route-table parsing and CIDR containment.
//!
//! `ip route ls` / `ip -6 route ls` output is parsed into a mapping
//! `network -> interface -> addresses`; the bootstrap path uses it to
//! infer the monitor network and the agent reports it as host facts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Networks on this host: net -> iface -> addresses on that iface.
pub type NetworkMap = BTreeMap<String, BTreeMap<String, BTreeSet<IpAddr>>>;

/// An IP network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cidr {
    pub net: IpAddr,
    pub prefix: u8,
}

impl Cidr {
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.net, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u32::MAX << (32 - self.prefix) };
                (u32::from(net) & mask) == (u32::from(*ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u128::MAX << (128 - self.prefix) };
                (u128::from(net) & mask) == (u128::from(*ip) & mask)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.net, self.prefix)
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (net, prefix) = s
            .split_once('/')
            .ok_or_else(|| Error::InvalidArgs(format!("{s:?} is not CIDR notation")))?;
        let net: IpAddr =
            net.parse().map_err(|_| Error::InvalidArgs(format!("{net:?} is not an IP address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::InvalidArgs(format!("{prefix:?} is not a prefix length")))?;
        let max = match net {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(Error::InvalidArgs(format!("prefix /{prefix} too long for {net}")));
        }
        Ok(Cidr { net, prefix })
    }
}

/// Parse a comma- or space-separated list of CIDRs, failing on any
/// malformed entry.
pub fn parse_cidr_list(s: &str) -> Result<Vec<Cidr>> {
    s.split(|c| c == ',' || c == ' ')
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect()
}

/// Parse `ip route ls` output. Only kernel-scope entries carrying both a
/// device and a source address contribute; `default` routes do not.
pub fn parse_ipv4_route(out: &str) -> NetworkMap {
    let mut map = NetworkMap::new();
    for line in out.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(net) = fields.first() else { continue };
        if !net.contains('/') || net.parse::<Cidr>().is_err() {
            continue;
        }
        let iface = field_after(&fields, "dev");
        let src = field_after(&fields, "src").and_then(|s| s.parse::<IpAddr>().ok());
        if let (Some(iface), Some(src)) = (iface, src) {
            map.entry(net.to_string())
                .or_default()
                .entry(iface.to_string())
                .or_default()
                .insert(src);
        }
    }
    map
}

/// Parse `ip -6 route ls` plus `ip -6 addr` output. Routes name the
/// networks and devices; the address listing supplies the IPs, assigned
/// to whichever parsed network contains them.
pub fn parse_ipv6_route(route_out: &str, addr_out: &str) -> NetworkMap {
    let mut map = NetworkMap::new();
    let mut nets: Vec<(Cidr, String, String)> = Vec::new();
    for line in route_out.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(net) = fields.first() else { continue };
        let Ok(cidr) = net.parse::<Cidr>() else { continue };
        // Link-local and multicast nets say nothing about cluster reach.
        if net.starts_with("fe80::") || net.starts_with("ff00::") {
            continue;
        }
        if let Some(iface) = field_after(&fields, "dev") {
            nets.push((cidr, net.to_string(), iface.to_string()));
        }
    }
    for line in addr_out.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&"inet6") {
            continue;
        }
        let Some(addr) = fields.get(1) else { continue };
        let ip_str = addr.split('/').next().unwrap_or(addr);
        let Ok(ip) = ip_str.parse::<IpAddr>() else { continue };
        for (cidr, net, iface) in &nets {
            if cidr.contains(&ip) {
                map.entry(net.clone())
                    .or_default()
                    .entry(iface.clone())
                    .or_default()
                    .insert(ip);
            }
        }
    }
    map
}

/// Find the network containing `ip` in a parsed map.
pub fn containing_net<'a>(ip: &IpAddr, map: &'a NetworkMap) -> Option<&'a str> {
    map.keys()
        .find(|net| net.parse::<Cidr>().is_ok_and(|c| c.contains(ip)))
        .map(String::as_str)
}

fn field_after<'a>(fields: &[&'a str], key: &str) -> Option<&'a str> {
    fields.iter().position(|f| *f == key).and_then(|i| fields.get(i + 1)).copied()
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod tests;
