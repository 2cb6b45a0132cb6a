// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster and daemon identity types.
//!
//! A [`ClusterId`] is the UUID that namespaces every on-disk path, systemd
//! unit, container name and cgroup slice belonging to one cluster on this
//! host. A [`DaemonId`] is the `(kind, instance)` pair that is unique
//! within a cluster.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::kind::DaemonKind;

/// UUID identifying one cluster on this host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    /// Parse and validate a cluster id. The canonical form is the
    /// lowercase hyphenated UUID.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let uuid = uuid::Uuid::parse_str(s)
            .map_err(|_| Error::InvalidArgs(format!("{s:?} is not a valid cluster id (UUID)")))?;
        Ok(Self(uuid.as_hyphenated().to_string()))
    }

    /// Generate a fresh random cluster id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().as_hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClusterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for ClusterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `(kind, instance)` pair naming one daemon within a cluster.
///
/// The canonical text form is `<kind>.<instance>`, e.g. `mon.a` or
/// `osd.3`. Instance ids are free strings; only emptiness is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DaemonId {
    pub kind: DaemonKind,
    pub id: String,
}

impl DaemonId {
    pub fn new(kind: DaemonKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    /// Parse `<kind>.<instance>`. The instance may itself contain dots
    /// (e.g. `mon.host.example.com`), so only the first dot splits.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let (kind, id) = name
            .split_once('.')
            .ok_or_else(|| Error::InvalidArgs(format!("daemon name {name:?} must be <kind>.<id>")))?;
        if id.is_empty() {
            return Err(Error::InvalidArgs(format!("daemon name {name:?} has an empty instance id")));
        }
        Ok(Self { kind: kind.parse()?, id: id.to_string() })
    }
}

impl fmt::Display for DaemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

impl FromStr for DaemonId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::parse(s)
    }
}

impl Serialize for DaemonId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DaemonId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
