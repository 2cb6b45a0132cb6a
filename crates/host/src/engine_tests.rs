// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeEngine;
use silo_core::error::EXIT_TIMEOUT;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn call_checked_passes_success_through() {
    let engine = FakeEngine::new();
    engine.respond_ok("version", "podman version 3.4.1");
    let out = call_checked(&engine, &argv(&["podman", "version"]), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(out.stdout, "podman version 3.4.1");
}

#[tokio::test]
async fn call_checked_surfaces_failures() {
    let engine = FakeEngine::new();
    engine.respond_fail("pull", "manifest unknown", 125);
    let err = call_checked(&engine, &argv(&["podman", "pull", "img"]), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessFailed { code: 125, .. }));
}

#[tokio::test]
async fn call_checked_maps_124_to_timeout() {
    let engine = FakeEngine::new();
    engine.respond(
        "pull",
        CommandOutput { stdout: String::new(), stderr: String::new(), code: EXIT_TIMEOUT },
    );
    let err = call_checked(&engine, &argv(&["podman", "pull", "img"]), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn retry_repeats_only_transient_failures() {
    let engine = FakeEngine::new();
    engine.respond_fail("pull", "net/http: TLS handshake timeout", 125);
    let err = call_retry(&engine, &argv(&["podman", "pull", "img"]), Duration::from_secs(5), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessFailed { .. }));
    assert_eq!(engine.call_count(), 3);
}

#[tokio::test]
async fn retry_fails_fast_on_other_errors() {
    let engine = FakeEngine::new();
    engine.respond_fail("pull", "manifest unknown", 125);
    let _ = call_retry(&engine, &argv(&["podman", "pull", "img"]), Duration::from_secs(5), 3)
        .await
        .unwrap_err();
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn unscripted_calls_succeed_empty() {
    let engine = FakeEngine::new();
    let out =
        call_checked(&engine, &argv(&["podman", "rm", "x"]), Duration::from_secs(5)).await.unwrap();
    assert_eq!(out.stdout, "");
    assert_eq!(engine.calls_containing("rm x").len(), 1);
}
