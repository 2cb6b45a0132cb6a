// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration as StdDuration;

fn handler(dir: &std::path::Path) -> (PushHandler, Arc<Notify>, Arc<Notify>) {
    let ls_wakeup = Arc::new(Notify::new());
    let volume_wakeup = Arc::new(Notify::new());
    let handler = PushHandler {
        data_dir: dir.to_path_buf(),
        ack: Arc::new(AtomicU64::new(0)),
        wakeups: vec![ls_wakeup.clone(), volume_wakeup.clone()],
    };
    (handler, ls_wakeup, volume_wakeup)
}

async fn exchange(handler: &PushHandler, request: &[u8]) -> (Vec<u8>, Result<()>) {
    let (mut client, server) = tokio::io::duplex(1 << 20);
    let served = {
        // The in-memory pipe stands in for the TLS stream.
        let write = client.write_all(request);
        let serve = handler.serve_connection(server);
        let (write_result, serve_result) = tokio::join!(write, serve);
        write_result.unwrap();
        serve_result
    };
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    (response, served)
}

fn frame(payload: &str) -> Vec<u8> {
    let mut framed = format!("{:010}", payload.len()).into_bytes();
    framed.extend_from_slice(payload.as_bytes());
    framed
}

#[tokio::test]
async fn push_with_config_acks_writes_files_and_wakes_gatherers() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, ls_wakeup, volume_wakeup) = handler(dir.path());

    let payload = r#"{"counter":7,"config":{"agent.json":"{}"}}"#;
    let (response, served) = exchange(&handler, &frame(payload)).await;
    served.unwrap();

    assert_eq!(response, b"ACK");
    assert_eq!(handler.ack.load(Ordering::SeqCst), 7);
    assert_eq!(std::fs::read_to_string(dir.path().join("agent.json")).unwrap(), "{}");
    // Both gatherers hold a wakeup permit.
    tokio::time::timeout(StdDuration::from_secs(1), ls_wakeup.notified()).await.unwrap();
    tokio::time::timeout(StdDuration::from_secs(1), volume_wakeup.notified()).await.unwrap();
}

#[tokio::test]
async fn push_without_config_still_acks_and_updates_the_counter() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _, _) = handler(dir.path());
    let (response, served) = exchange(&handler, &frame(r#"{"counter":41}"#)).await;
    served.unwrap();
    assert_eq!(response, b"ACK");
    assert_eq!(handler.ack.load(Ordering::SeqCst), 41);
}

#[tokio::test]
async fn bad_length_prefix_sends_the_error_and_closes() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _, _) = handler(dir.path());
    let mut request = b"00bogus000".to_vec();
    request.extend_from_slice(b"trailing data that must never be read as a frame");
    let (response, served) = exchange(&handler, &request).await;
    assert!(served.is_err());
    let text = String::from_utf8(response).unwrap();
    assert_ne!(text, "ACK");
    assert!(text.contains("not a decimal integer"), "{text}");
}

#[tokio::test]
async fn malformed_json_reports_the_error_to_the_peer() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _, _) = handler(dir.path());
    let (response, served) = exchange(&handler, &frame("{broken")).await;
    // The connection itself completed; only the message was bad.
    served.unwrap();
    let text = String::from_utf8(response).unwrap();
    assert_ne!(text, "ACK");
    assert!(handler.ack.load(Ordering::SeqCst) == 0);
}

#[tokio::test]
async fn unrecognized_pushed_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (handler, _, _) = handler(dir.path());
    let payload = r#"{"counter":1,"config":{"../evil":"x","keyring":"k"}}"#;
    let (response, served) = exchange(&handler, &frame(payload)).await;
    served.unwrap();
    assert_eq!(response, b"ACK");
    assert!(!dir.path().join("../evil").exists());
    assert_eq!(std::fs::read_to_string(dir.path().join("keyring")).unwrap(), "k");
}

#[test]
fn port_scan_claims_the_first_free_port() {
    // Grab a port, then ask the scanner to start there: it must step past.
    let held = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let start = held.local_addr().unwrap().port();
    let selected = select_listener_port(start).unwrap();
    assert!(selected > start);
    assert!(selected <= start + PORT_SCAN_LIMIT);
}

#[test]
fn port_scan_stops_at_the_u16_ceiling() {
    // Starting near the top must not wrap around.
    let result = select_listener_port(u16::MAX);
    // Either the single port at the ceiling is free or the scan fails;
    // wrapping to low ports would be the bug.
    if let Ok(port) = result {
        assert_eq!(port, u16::MAX);
    }
}
