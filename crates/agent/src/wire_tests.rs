// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn zero_padded_length_parses() {
    assert_eq!(parse_length(b"0000000041").unwrap(), 41);
    assert_eq!(parse_length(b"0000000000").unwrap(), 0);
}

#[test]
fn wrong_prefix_size_is_rejected() {
    assert!(parse_length(b"41").is_err());
    assert!(parse_length(b"00000000411").is_err());
}

#[test]
fn non_decimal_prefix_is_rejected() {
    assert!(parse_length(b"0000zz0041").is_err());
    assert!(parse_length(b"\xff\xff\xff\xff\xff\xff\xff\xff\xff\xff").is_err());
}

#[test]
fn oversized_length_is_rejected() {
    assert!(parse_length(b"9999999999").is_err());
}

#[test]
fn message_with_config_parses() {
    let msg =
        parse_message(br#"{"counter":7,"config":{"agent.json":"{}"}}"#).unwrap();
    assert_eq!(msg.counter, 7);
    let config = msg.config.unwrap();
    assert_eq!(config["agent.json"], "{}");
}

#[test]
fn message_without_config_parses() {
    let msg = parse_message(br#"{"counter":12}"#).unwrap();
    assert_eq!(msg.counter, 12);
    assert!(msg.config.is_none());
}

#[test]
fn malformed_json_is_an_error() {
    assert!(parse_message(b"{not json").is_err());
}
