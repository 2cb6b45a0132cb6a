// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn single_doc_flat_pairs() {
    let docs = parse_docs("service_type: mon\nplacement: host1\n");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["service_type"], "mon");
    assert_eq!(docs[0]["placement"], "host1");
}

#[test]
fn docs_split_on_triple_dash() {
    let docs = parse_docs("service_type: mon\n---\nservice_type: mgr\n---\n");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["service_type"], "mon");
    assert_eq!(docs[1]["service_type"], "mgr");
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let docs = parse_docs("# header\n\nservice_type: osd\n  # indented comment\n");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].len(), 1);
}

#[test]
fn multiline_continuation_collects_deeper_lines() {
    let input = "service_type: rgw\nspec:\n  rgw_realm: default\n  rgw_zone: z1\nlabel: x\n";
    let docs = parse_docs(input);
    assert_eq!(docs[0]["spec"], "rgw_realm: default\nrgw_zone: z1");
    assert_eq!(docs[0]["label"], "x");
}

#[test]
fn pipe_marker_also_continues() {
    let input = "data: |\n  line one\n  line two\n";
    let docs = parse_docs(input);
    assert_eq!(docs[0]["data"], "line one\nline two");
}

#[test]
fn empty_input_yields_no_docs() {
    assert!(parse_docs("").is_empty());
    assert!(parse_docs("---\n---\n").is_empty());
}
