// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn inline_json_passes_through() {
    let blob = read_json_blob(r#"{"config":"x"}"#).unwrap();
    assert_eq!(blob, r#"{"config":"x"}"#);
}

#[test]
fn file_path_json_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"keyring":"k"}"#).unwrap();
    let blob = read_json_blob(path.to_str().unwrap()).unwrap();
    assert_eq!(blob, r#"{"keyring":"k"}"#);
}

#[test]
fn missing_json_file_errors() {
    assert!(read_json_blob("/does/not/exist.json").is_err());
}

#[test]
fn tcp_ports_split_on_whitespace() {
    assert_eq!(parse_ports("3300 6789").unwrap(), vec![3300, 6789]);
    assert_eq!(parse_ports("  80  ").unwrap(), vec![80]);
    assert!(parse_ports("80 eleventy").is_err());
}
