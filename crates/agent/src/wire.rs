// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The manager-push wire format.
//!
//! A pushed message is a 10-byte ASCII decimal length prefix followed by
//! exactly that many bytes of JSON. The reply is the literal `ACK` or a
//! UTF-8 error string. A malformed length closes the connection — there
//! is no way to resynchronize a stream after a bad prefix.

use std::collections::BTreeMap;

use serde::Deserialize;
use silo_core::error::{Error, Result};

pub const LENGTH_PREFIX_BYTES: usize = 10;

/// Refuse anything bigger than a manager would ever push.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

pub const ACK: &[u8] = b"ACK";

/// A pushed message: an ack counter and optionally replacement config
/// files.
#[derive(Debug, Clone, Deserialize)]
pub struct MgrMessage {
    pub counter: u64,
    #[serde(default)]
    pub config: Option<BTreeMap<String, String>>,
}

/// Parse the 10-byte ASCII length prefix.
pub fn parse_length(header: &[u8]) -> Result<usize> {
    if header.len() != LENGTH_PREFIX_BYTES {
        return Err(Error::InvalidArgs(format!(
            "length prefix must be {LENGTH_PREFIX_BYTES} bytes, got {}",
            header.len()
        )));
    }
    let text = std::str::from_utf8(header)
        .map_err(|_| Error::InvalidArgs("length prefix is not ASCII".into()))?;
    let length: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("length prefix {text:?} is not a decimal integer")))?;
    if length > MAX_MESSAGE_BYTES {
        return Err(Error::InvalidArgs(format!("message length {length} exceeds the limit")));
    }
    Ok(length)
}

/// Parse the JSON payload after the prefix.
pub fn parse_message(payload: &[u8]) -> Result<MgrMessage> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
