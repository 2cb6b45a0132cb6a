// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of daemon kinds siloadm knows how to manage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Every daemon kind this host tool can deploy, adopt or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DaemonKind {
    Mon,
    Mgr,
    Mds,
    Osd,
    Rgw,
    Mirror,
    Crash,
    Nfs,
    Iscsi,
    Haproxy,
    Keepalived,
    SnmpGateway,
    Prometheus,
    NodeExporter,
    Alertmanager,
    Grafana,
    Container,
    Agent,
}

impl DaemonKind {
    /// All kinds, in registry order.
    pub const ALL: &'static [DaemonKind] = &[
        DaemonKind::Mon,
        DaemonKind::Mgr,
        DaemonKind::Mds,
        DaemonKind::Osd,
        DaemonKind::Rgw,
        DaemonKind::Mirror,
        DaemonKind::Crash,
        DaemonKind::Nfs,
        DaemonKind::Iscsi,
        DaemonKind::Haproxy,
        DaemonKind::Keepalived,
        DaemonKind::SnmpGateway,
        DaemonKind::Prometheus,
        DaemonKind::NodeExporter,
        DaemonKind::Alertmanager,
        DaemonKind::Grafana,
        DaemonKind::Container,
        DaemonKind::Agent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonKind::Mon => "mon",
            DaemonKind::Mgr => "mgr",
            DaemonKind::Mds => "mds",
            DaemonKind::Osd => "osd",
            DaemonKind::Rgw => "rgw",
            DaemonKind::Mirror => "mirror",
            DaemonKind::Crash => "crash",
            DaemonKind::Nfs => "nfs",
            DaemonKind::Iscsi => "iscsi",
            DaemonKind::Haproxy => "haproxy",
            DaemonKind::Keepalived => "keepalived",
            DaemonKind::SnmpGateway => "snmp-gateway",
            DaemonKind::Prometheus => "prometheus",
            DaemonKind::NodeExporter => "node-exporter",
            DaemonKind::Alertmanager => "alertmanager",
            DaemonKind::Grafana => "grafana",
            DaemonKind::Container => "container",
            DaemonKind::Agent => "agent",
        }
    }

    /// Storage daemons proper: their uid/gid comes from a stat inside the
    /// image, and their config/keyring pair is materialized on deploy.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            DaemonKind::Mon
                | DaemonKind::Mgr
                | DaemonKind::Mds
                | DaemonKind::Osd
                | DaemonKind::Rgw
                | DaemonKind::Mirror
                | DaemonKind::Crash
        )
    }

    /// Monitoring stack members carry a fixed uid/gid pair and a config
    /// subtree instead of a config/keyring pair.
    pub fn is_monitoring(&self) -> bool {
        matches!(
            self,
            DaemonKind::Prometheus
                | DaemonKind::NodeExporter
                | DaemonKind::Alertmanager
                | DaemonKind::Grafana
        )
    }

    /// Kinds whose data dir is backed up instead of deleted on remove.
    pub fn is_dangerous(&self) -> bool {
        matches!(self, DaemonKind::Mon | DaemonKind::Osd | DaemonKind::Prometheus)
    }

    /// Kinds whose removal demands an explicit `--force`.
    pub fn requires_force_on_remove(&self) -> bool {
        matches!(self, DaemonKind::Mon | DaemonKind::Osd)
    }

    /// Kinds that can be adopted from a package-manager install.
    pub fn is_adoptable(&self) -> bool {
        matches!(
            self,
            DaemonKind::Mon
                | DaemonKind::Mgr
                | DaemonKind::Mds
                | DaemonKind::Osd
                | DaemonKind::Rgw
                | DaemonKind::Crash
                | DaemonKind::Prometheus
                | DaemonKind::Alertmanager
                | DaemonKind::Grafana
                | DaemonKind::NodeExporter
        )
    }

    /// False only for the agent, which runs as a plain process from a
    /// unit file and never goes through the container composer.
    pub fn runs_managed_container(&self) -> bool {
        !matches!(self, DaemonKind::Agent)
    }
}

impl fmt::Display for DaemonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaemonKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        DaemonKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
#[path = "kind_tests.rs"]
mod tests;
