// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn grab_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[test]
fn free_ports_pass() {
    let (listener, port) = grab_port();
    drop(listener);
    let daemon = DaemonId::parse("mon.a").unwrap();
    check_ports(&daemon, &[port]).unwrap();
}

#[test]
fn bound_port_is_rejected() {
    let (_listener, port) = grab_port();
    let daemon = DaemonId::parse("mon.a").unwrap();
    let err = check_ports(&daemon, &[port]).unwrap_err();
    assert!(matches!(err, Error::PortBusy { port: p } if p == port));
}

#[test]
fn manager_gets_a_warning_instead() {
    let (_listener, port) = grab_port();
    let daemon = DaemonId::parse("mgr.x").unwrap();
    check_ports(&daemon, &[port]).unwrap();
}

#[test]
fn empty_port_list_passes() {
    let daemon = DaemonId::parse("osd.0").unwrap();
    check_ports(&daemon, &[]).unwrap();
}
