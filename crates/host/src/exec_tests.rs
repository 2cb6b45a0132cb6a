// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use silo_core::error::Error;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn captures_stdout_and_exit_code() {
    let out = run(&argv(&["echo", "hello"]), Duration::from_secs(5)).await.unwrap();
    assert_eq!(out.stdout.trim(), "hello");
    assert_eq!(out.code, 0);
    assert!(out.success());
}

#[tokio::test]
async fn captures_stderr_on_failure() {
    let out = run(&argv(&["sh", "-c", "echo oops >&2; exit 3"]), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(out.code, 3);
    assert_eq!(out.stderr.trim(), "oops");
}

#[tokio::test]
async fn timeout_yields_exit_code_124() {
    let out = run(&argv(&["sleep", "30"]), Duration::from_millis(100)).await.unwrap();
    assert_eq!(out.code, 124);
    assert!(out.timed_out());
}

#[tokio::test]
async fn run_checked_maps_timeout_to_process_timeout() {
    let err = run_checked(&argv(&["sleep", "30"]), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessTimeout { .. }));
    assert_eq!(err.exit_code(), 124);
}

#[tokio::test]
async fn run_checked_maps_failure_to_process_failed() {
    let err = run_checked(&argv(&["sh", "-c", "exit 7"]), Duration::from_secs(5))
        .await
        .unwrap_err();
    let Error::ProcessFailed { code, .. } = err else {
        panic!("expected ProcessFailed")
    };
    assert_eq!(code, 7);
}

#[tokio::test]
async fn empty_command_is_invalid() {
    assert!(run(&[], Duration::from_secs(1)).await.is_err());
}

#[test]
fn transient_patterns_are_the_documented_three() {
    assert!(is_transient_runtime_error(
        "error creating read-write layer with ID abc: layer exists"
    ));
    assert!(is_transient_runtime_error("Get https://registry: net/http: TLS handshake timeout"));
    assert!(is_transient_runtime_error("Digest did not match, expected sha256:x"));
    assert!(!is_transient_runtime_error("manifest unknown"));
    assert!(!is_transient_runtime_error("permission denied"));
}
