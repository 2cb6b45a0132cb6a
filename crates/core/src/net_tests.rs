// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const V4_ROUTE: &str = "\
default via 10.0.0.1 dev eth0 proto dhcp metric 100
10.0.0.0/24 dev eth0 proto kernel scope link src 10.0.0.5 metric 100
172.17.0.0/16 dev docker0 proto kernel scope link src 172.17.0.1 linkdown
192.168.122.0/24 dev virbr0 proto kernel scope link src 192.168.122.1
";

#[test]
fn ipv4_route_parses_nets_ifaces_and_srcs() {
    let map = parse_ipv4_route(V4_ROUTE);
    assert_eq!(map.len(), 3);
    let eth0 = &map["10.0.0.0/24"]["eth0"];
    assert!(eth0.contains(&"10.0.0.5".parse().unwrap()));
    assert!(map["172.17.0.0/16"].contains_key("docker0"));
}

#[test]
fn default_routes_are_skipped() {
    let map = parse_ipv4_route("default via 10.0.0.1 dev eth0\n");
    assert!(map.is_empty());
}

#[test]
fn every_parsed_ip_lies_within_its_net() {
    let map = parse_ipv4_route(V4_ROUTE);
    for (net, ifaces) in &map {
        let cidr: Cidr = net.parse().unwrap();
        for ips in ifaces.values() {
            for ip in ips {
                assert!(cidr.contains(ip), "{ip} outside {net}");
            }
        }
    }
}

const V6_ROUTE: &str = "\
::1 dev lo proto kernel metric 256 pref medium
2001:db8:4321::/64 dev eth0 proto ra metric 100 pref medium
fe80::/64 dev eth0 proto kernel metric 256 pref medium
";

const V6_ADDR: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 state UNKNOWN qlen 1000
    inet6 ::1/128 scope host
2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 state UP qlen 1000
    inet6 2001:db8:4321::5/64 scope global
    inet6 fe80::f816:3eff:fe5b:39e4/64 scope link
";

#[test]
fn ipv6_route_joins_routes_with_addresses() {
    let map = parse_ipv6_route(V6_ROUTE, V6_ADDR);
    let eth0 = &map["2001:db8:4321::/64"]["eth0"];
    assert!(eth0.contains(&"2001:db8:4321::5".parse().unwrap()));
    // Link-local nets are not cluster networks.
    assert!(!map.contains_key("fe80::/64"));
}

#[test]
fn ipv6_invariant_ips_within_net() {
    let map = parse_ipv6_route(V6_ROUTE, V6_ADDR);
    for (net, ifaces) in &map {
        let cidr: Cidr = net.parse().unwrap();
        for ips in ifaces.values() {
            for ip in ips {
                assert!(cidr.contains(ip), "{ip} outside {net}");
            }
        }
    }
}

#[test]
fn containing_net_finds_the_mon_network() {
    let map = parse_ipv4_route(V4_ROUTE);
    let ip: IpAddr = "10.0.0.5".parse().unwrap();
    assert_eq!(containing_net(&ip, &map), Some("10.0.0.0/24"));
    let stranger: IpAddr = "203.0.113.9".parse().unwrap();
    assert_eq!(containing_net(&stranger, &map), None);
}

#[test]
fn cidr_contains_edges() {
    let net: Cidr = "10.0.0.0/24".parse().unwrap();
    assert!(net.contains(&"10.0.0.0".parse().unwrap()));
    assert!(net.contains(&"10.0.0.255".parse().unwrap()));
    assert!(!net.contains(&"10.0.1.0".parse().unwrap()));
    let all: Cidr = "0.0.0.0/0".parse().unwrap();
    assert!(all.contains(&"203.0.113.9".parse().unwrap()));
}

#[test]
fn cidr_rejects_malformed() {
    assert!("10.0.0.0".parse::<Cidr>().is_err());
    assert!("10.0.0.0/33".parse::<Cidr>().is_err());
    assert!("nonsense/8".parse::<Cidr>().is_err());
}

#[test]
fn cidr_list_fails_on_any_bad_entry() {
    let nets = parse_cidr_list("10.0.0.0/24,192.168.0.0/16").unwrap();
    assert_eq!(nets.len(), 2);
    assert!(parse_cidr_list("10.0.0.0/24,bogus").is_err());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Masking an address into a net always yields a member of that net.
        #[test]
        fn masked_addresses_are_members(ip: u32, prefix in 0u8..=32) {
            let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
            let net = Cidr {
                net: IpAddr::V4((ip & mask).into()),
                prefix,
            };
            prop_assert!(net.contains(&IpAddr::V4(ip.into())));
        }

        // Display output re-parses to the same network.
        #[test]
        fn cidr_display_round_trips(ip: u32, prefix in 0u8..=32) {
            let net = Cidr { net: IpAddr::V4(ip.into()), prefix };
            let back: Cidr = net.to_string().parse().unwrap();
            prop_assert_eq!(net, back);
        }
    }
}
