// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn finds_a_plain_value() {
    let content = "[global]\nfsid = 1111-2222\nmon_host = 10.0.0.5\n";
    assert_eq!(parse_value(content, "fsid").as_deref(), Some("1111-2222"));
}

#[test]
fn commented_values_do_not_count() {
    let content = "[global]\n# fsid = 1111-2222\n; fsid = 3333\n";
    assert_eq!(parse_value(content, "fsid"), None);
}

#[test]
fn first_assignment_wins() {
    let content = "fsid = first\nfsid = second\n";
    assert_eq!(parse_value(content, "fsid").as_deref(), Some("first"));
}

#[test]
fn whitespace_is_trimmed() {
    assert_eq!(parse_value("  fsid   =   abc  \n", "fsid").as_deref(), Some("abc"));
}

#[test]
fn missing_key_is_none() {
    assert_eq!(parse_value("[global]\nother = 1\n", "fsid"), None);
}
