// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bare_ipv4_yields_both_protocols() {
    let parsed = parse_mon_addr("10.0.0.5").unwrap();
    assert_eq!(parsed.addrs.to_string(), "[v2:10.0.0.5:3300,v1:10.0.0.5:6789]");
    assert!(parsed.warnings.is_empty());
}

#[test]
fn legacy_port_yields_v1_only() {
    let parsed = parse_mon_addr("10.0.0.5:6789").unwrap();
    assert_eq!(parsed.addrs.to_string(), "[v1:10.0.0.5:6789]");
    assert!(parsed.warnings.is_empty());
}

#[test]
fn v2_port_yields_v2_only() {
    let parsed = parse_mon_addr("10.0.0.5:3300").unwrap();
    assert_eq!(parsed.addrs.to_string(), "[v2:10.0.0.5:3300]");
    assert!(parsed.warnings.is_empty());
}

#[test]
fn other_port_yields_v2_with_warning() {
    let parsed = parse_mon_addr("10.0.0.5:7000").unwrap();
    assert_eq!(parsed.addrs.to_string(), "[v2:10.0.0.5:7000]");
    assert_eq!(parsed.warnings.len(), 1);
}

#[test]
fn bracketed_vector_is_preserved() {
    let input = "[v2:10.0.0.5:3300,v1:10.0.0.5:6789]";
    let parsed = parse_mon_addr(input).unwrap();
    assert_eq!(parsed.addrs.to_string(), input);
}

#[test]
fn bracketed_ipv6_bare() {
    let parsed = parse_mon_addr("[2001:db8::1]").unwrap();
    assert_eq!(
        parsed.addrs.to_string(),
        "[v2:[2001:db8::1]:3300,v1:[2001:db8::1]:6789]"
    );
}

#[test]
fn bracketed_ipv6_with_port() {
    let parsed = parse_mon_addr("[2001:db8::1]:6789").unwrap();
    assert_eq!(parsed.addrs.to_string(), "[v1:[2001:db8::1]:6789]");
}

#[test]
fn ipv6_vector_round_trips() {
    let input = "[v2:[2001:db8::1]:3300,v1:[2001:db8::1]:6789]";
    let parsed = parse_mon_addr(input).unwrap();
    assert_eq!(parsed.addrs.to_string(), input);
}

#[test]
fn primary_ip_is_first_endpoint() {
    let parsed = parse_mon_addr("10.0.0.5:3300").unwrap();
    assert_eq!(parsed.addrs.primary_ip(), Some("10.0.0.5".parse().unwrap()));
}

#[test]
fn malformed_inputs_fail() {
    for bad in ["", "not-an-ip", "10.0.0.5:notaport", "[v3:10.0.0.5:3300]", "[v2:10.0.0.5]"] {
        assert!(parse_mon_addr(bad).is_err(), "{bad:?} should fail");
    }
}

#[test]
fn canonicalization_round_trips() {
    // Re-parsing a canonical rendering yields the same vector.
    for input in ["10.0.0.5", "10.0.0.5:6789", "10.0.0.5:3300", "10.0.0.5:7000"] {
        let first = parse_mon_addr(input).unwrap().addrs;
        let second = parse_mon_addr(&first.to_string()).unwrap().addrs;
        assert_eq!(first, second, "{input}");
    }
}
