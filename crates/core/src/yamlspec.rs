// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deliberately restricted YAML reader for `bootstrap --apply-spec`.
//!
//! The accepted grammar is: documents separated by top-level `---` lines,
//! each a flat sequence of `key: value` pairs, with exactly one
//! continuation form — a key whose value is empty collects the following
//! deeper-indented lines as a newline-joined block. Anything richer must
//! go through the manager, not this tool.

use std::collections::BTreeMap;

/// One parsed document: flat key/value pairs in input order.
pub type SpecDoc = BTreeMap<String, String>;

/// Split the input into documents and parse each one.
pub fn parse_docs(input: &str) -> Vec<SpecDoc> {
    let mut docs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in input.lines() {
        if line.trim_end() == "---" {
            if !current.is_empty() {
                docs.push(parse_doc(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        docs.push(parse_doc(&current));
    }
    docs.retain(|d| !d.is_empty());
    docs
}

fn parse_doc(lines: &[&str]) -> SpecDoc {
    let mut doc = SpecDoc::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else { continue };
        let key = key.trim().to_string();
        let value = value.trim();
        if !value.is_empty() && value != "|" {
            doc.insert(key, value.to_string());
            continue;
        }
        // The one multiline continuation: collect deeper-indented lines.
        let base_indent = indent_of(line);
        let mut block = Vec::new();
        while i < lines.len() {
            let next = lines[i];
            if next.trim().is_empty() {
                block.push(String::new());
                i += 1;
                continue;
            }
            if indent_of(next) <= base_indent {
                break;
            }
            block.push(next.trim().to_string());
            i += 1;
        }
        while block.last().is_some_and(String::is_empty) {
            block.pop();
        }
        doc.insert(key, block.join("\n"));
    }
    doc
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
#[path = "yamlspec_tests.rs"]
mod tests;
