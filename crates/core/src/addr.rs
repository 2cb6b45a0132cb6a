// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor address parsing and canonicalization.
//!
//! The bootstrap path accepts a bare IP, an `IP:port` pair, or a full
//! address vector `[v2:ip:port,v1:ip:port]`. The legacy protocol listens
//! on 6789 (v1), the current one on 3300 (v2).

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const V1_PORT: u16 = 6789;
pub const V2_PORT: u16 = 3300;

/// Monitor wire protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonProto {
    V1,
    V2,
}

impl fmt::Display for MonProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonProto::V1 => f.write_str("v1"),
            MonProto::V2 => f.write_str("v2"),
        }
    }
}

/// One monitor endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonAddr {
    pub proto: MonProto,
    pub ip: IpAddr,
    pub port: u16,
}

impl fmt::Display for MonAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V6(ip) => write!(f, "{}:[{}]:{}", self.proto, ip, self.port),
            IpAddr::V4(ip) => write!(f, "{}:{}:{}", self.proto, ip, self.port),
        }
    }
}

/// Canonical monitor address vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrVec(pub Vec<MonAddr>);

impl AddrVec {
    /// The IP of the first endpoint; every accepted input form yields at
    /// least one endpoint, so this is total for parsed vectors.
    pub fn primary_ip(&self) -> Option<IpAddr> {
        self.0.first().map(|a| a.ip)
    }
}

impl fmt::Display for AddrVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, addr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{addr}")?;
        }
        f.write_str("]")
    }
}

/// Parse result: the canonical vector plus any non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ParsedMonAddr {
    pub addrs: AddrVec,
    pub warnings: Vec<String>,
}

/// Parse a `--mon-ip`-style input into its canonical address vector.
///
/// - bare IP (v4 or bracketed/bare v6): both protocols on default ports
/// - `IP:6789`: v1 only; `IP:3300`: v2 only; any other port: v2 with a
///   warning
/// - `[v2:ip:port,v1:ip:port]`: preserved as given
pub fn parse_mon_addr(input: &str) -> Result<ParsedMonAddr> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidArgs("empty monitor address".into()));
    }

    // Address vector form: bracketed and the first element is tagged.
    if input.starts_with('[') && (input.contains("v1:") || input.contains("v2:")) {
        let inner = input
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| Error::InvalidArgs(format!("unbalanced address vector {input:?}")))?;
        let mut addrs = Vec::new();
        for part in split_vector(inner) {
            addrs.push(parse_tagged_addr(&part)?);
        }
        if addrs.is_empty() {
            return Err(Error::InvalidArgs(format!("empty address vector {input:?}")));
        }
        return Ok(ParsedMonAddr { addrs: AddrVec(addrs), warnings: Vec::new() });
    }

    // Bare IP, either family.
    if let Ok(ip) = bare_ip(input) {
        return Ok(ParsedMonAddr {
            addrs: AddrVec(vec![
                MonAddr { proto: MonProto::V2, ip, port: V2_PORT },
                MonAddr { proto: MonProto::V1, ip, port: V1_PORT },
            ]),
            warnings: Vec::new(),
        });
    }

    // IP:port.
    let (ip, port) = split_ip_port(input)?;
    let mut warnings = Vec::new();
    let proto = match port {
        V1_PORT => MonProto::V1,
        V2_PORT => MonProto::V2,
        other => {
            warnings.push(format!(
                "using protocol v2 for non-standard monitor port {other}"
            ));
            MonProto::V2
        }
    };
    Ok(ParsedMonAddr {
        addrs: AddrVec(vec![MonAddr { proto, ip, port }]),
        warnings,
    })
}

/// Split a vector body on commas that separate tagged elements. Colons
/// inside IPv6 literals never collide because elements start `v1:`/`v2:`.
fn split_vector(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0u32;
    for c in inner.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_tagged_addr(part: &str) -> Result<MonAddr> {
    let part = part.trim();
    let (proto, rest) = if let Some(rest) = part.strip_prefix("v2:") {
        (MonProto::V2, rest)
    } else if let Some(rest) = part.strip_prefix("v1:") {
        (MonProto::V1, rest)
    } else {
        return Err(Error::InvalidArgs(format!("address vector element {part:?} lacks a v1:/v2: tag")));
    };
    let (ip, port) = split_ip_port(rest)?;
    Ok(MonAddr { proto, ip, port })
}

fn bare_ip(s: &str) -> Result<IpAddr> {
    let s = s.strip_prefix('[').and_then(|t| t.strip_suffix(']')).unwrap_or(s);
    s.parse().map_err(|_| Error::InvalidArgs(format!("{s:?} is not an IP address")))
}

fn split_ip_port(s: &str) -> Result<(IpAddr, u16)> {
    // Bracketed IPv6 with port: [::1]:3300
    if let Some(rest) = s.strip_prefix('[') {
        let (ip, port) = rest
            .split_once("]:")
            .ok_or_else(|| Error::InvalidArgs(format!("{s:?} is not [ipv6]:port")))?;
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| Error::InvalidArgs(format!("{ip:?} is not an IPv6 address")))?;
        return Ok((ip, parse_port(port)?));
    }
    let (ip, port) = s
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidArgs(format!("{s:?} is not ip:port")))?;
    let ip: IpAddr =
        ip.parse().map_err(|_| Error::InvalidArgs(format!("{ip:?} is not an IP address")))?;
    Ok((ip, parse_port(port)?))
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse().map_err(|_| Error::InvalidArgs(format!("{s:?} is not a TCP port")))
}

#[cfg(test)]
#[path = "addr_tests.rs"]
mod tests;
