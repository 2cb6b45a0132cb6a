// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind daemon descriptors.
//!
//! One static table answers everything the engine needs to know about a
//! kind: image, entrypoint, required config files and arguments, default
//! ports, ownership policy, and the conventional subtree under the data
//! dir. Behaviors over the table are plain functions.

use crate::config::DeployConfig;
use crate::error::{Error, Result};
use crate::kind::DaemonKind;

/// Default image for storage daemons.
pub const DEFAULT_IMAGE: &str = "quay.io/silo/silo:v17";

/// Release name this build is pinned to; the bootstrap release guard
/// compares the image's advertised release against it.
pub const PINNED_RELEASE: &str = "basalt";

/// Static metadata for one daemon kind.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub kind: DaemonKind,
    pub default_image: &'static str,
    /// Entrypoint inside the image; `None` means the image default.
    pub entrypoint: Option<&'static str>,
    /// Files that must be present in `DeployConfig::files`.
    pub required_files: &'static [&'static str],
    /// Kind-specific config-json arguments that must be present.
    pub required_args: &'static [&'static str],
    pub default_ports: &'static [u16],
    /// Fixed ownership for kinds that never stat inside the image.
    pub fixed_uid_gid: Option<(u32, u32)>,
    /// Conventional subtree under the data dir for config files.
    pub config_subdir: Option<&'static str>,
    /// Extra empty directories created under the data dir.
    pub data_subdirs: &'static [&'static str],
}

const DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        kind: DaemonKind::Mon,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-mon"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[3300, 6789],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Mgr,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-mgr"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[8443, 9283],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Mds,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-mds"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Osd,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-osd"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Rgw,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-rgw"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[80],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Mirror,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-mirror"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Crash,
        default_image: DEFAULT_IMAGE,
        entrypoint: Some("/usr/bin/silo-crash"),
        required_files: &["config", "keyring"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Nfs,
        default_image: "quay.io/silo/ganesha:5.5",
        entrypoint: Some("/usr/bin/ganesha.nfsd"),
        required_files: &["ganesha.conf"],
        required_args: &["pool"],
        default_ports: &[2049],
        fixed_uid_gid: None,
        config_subdir: Some("etc/ganesha"),
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Iscsi,
        default_image: "quay.io/silo/iscsi-gateway:3.6",
        entrypoint: Some("/usr/bin/rbd-target-api"),
        required_files: &["iscsi-gateway.cfg"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &["configfs"],
    },
    Descriptor {
        kind: DaemonKind::Haproxy,
        default_image: "docker.io/library/haproxy:2.3",
        entrypoint: Some("/usr/local/sbin/haproxy"),
        required_files: &["haproxy.cfg"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: Some("haproxy"),
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Keepalived,
        default_image: "docker.io/arcts/keepalived:1.2.2",
        entrypoint: Some("/init.sh"),
        required_files: &["keepalived.conf"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: Some("keepalived"),
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::SnmpGateway,
        default_image: "docker.io/maxwo/snmp-notifier:v1.2.1",
        entrypoint: Some("/bin/snmp_notifier"),
        required_files: &[],
        required_args: &["destination", "snmp_version"],
        default_ports: &[9464],
        fixed_uid_gid: Some((65534, 65534)),
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Prometheus,
        default_image: "quay.io/prometheus/prometheus:v2.43.0",
        entrypoint: Some("/bin/prometheus"),
        required_files: &["prometheus.yml"],
        required_args: &[],
        default_ports: &[9095],
        fixed_uid_gid: Some((65534, 65534)),
        config_subdir: Some("etc/prometheus"),
        data_subdirs: &["data"],
    },
    Descriptor {
        kind: DaemonKind::NodeExporter,
        default_image: "quay.io/prometheus/node-exporter:v1.5.0",
        entrypoint: Some("/bin/node_exporter"),
        required_files: &[],
        required_args: &[],
        default_ports: &[9100],
        fixed_uid_gid: Some((65534, 65534)),
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Alertmanager,
        default_image: "quay.io/prometheus/alertmanager:v0.25.0",
        entrypoint: Some("/bin/alertmanager"),
        required_files: &["alertmanager.yml"],
        required_args: &["peers"],
        default_ports: &[9093, 9094],
        fixed_uid_gid: Some((65534, 65534)),
        config_subdir: Some("etc/alertmanager"),
        data_subdirs: &["data"],
    },
    Descriptor {
        kind: DaemonKind::Grafana,
        default_image: "quay.io/silo/silo-grafana:9.4.7",
        entrypoint: None,
        required_files: &["grafana.ini"],
        required_args: &[],
        default_ports: &[3000],
        fixed_uid_gid: Some((472, 472)),
        config_subdir: Some("etc/grafana"),
        data_subdirs: &["data", "etc/grafana/provisioning/datasources", "etc/grafana/certs"],
    },
    Descriptor {
        kind: DaemonKind::Container,
        default_image: "",
        entrypoint: None,
        required_files: &[],
        required_args: &["image"],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
    Descriptor {
        kind: DaemonKind::Agent,
        default_image: "",
        entrypoint: None,
        required_files: &["agent.json", "keyring", "listener.crt", "listener.key", "root_cert.pem"],
        required_args: &[],
        default_ports: &[],
        fixed_uid_gid: None,
        config_subdir: None,
        data_subdirs: &[],
    },
];

/// Look up the descriptor for a kind. Total over [`DaemonKind`].
pub fn descriptor(kind: DaemonKind) -> &'static Descriptor {
    // The table covers every variant; the fallback is unreachable but
    // keeps the lookup total without panicking.
    DESCRIPTORS.iter().find(|d| d.kind == kind).unwrap_or(&DESCRIPTORS[0])
}

/// Validate a structured config against the kind's descriptor.
///
/// All missing required files and arguments are reported in one error.
pub fn validate(kind: DaemonKind, config: &DeployConfig) -> Result<()> {
    let desc = descriptor(kind);
    let mut missing = Vec::new();
    for file in desc.required_files {
        if !config.files.contains_key(*file) {
            missing.push(format!("required file {file}"));
        }
    }
    for arg in desc.required_args {
        if !config.has_arg(arg) {
            missing.push(format!("required arg {arg}"));
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidConfig { which: missing.join(", ") })
    }
}

/// Per-kind arguments appended after the entrypoint, some computed from
/// the structured config.
pub fn extra_daemon_args(
    kind: DaemonKind,
    daemon_id: &str,
    config: &DeployConfig,
) -> Vec<String> {
    let mut args: Vec<String> = match kind {
        DaemonKind::Mon | DaemonKind::Mgr | DaemonKind::Mds | DaemonKind::Osd
        | DaemonKind::Rgw => vec![
            "-n".into(),
            format!("{kind}.{daemon_id}"),
            "-f".into(),
            "--setuser".into(),
            "silo".into(),
            "--setgroup".into(),
            "silo".into(),
            "--default-log-to-file=false".into(),
            "--default-log-to-stderr=true".into(),
        ],
        DaemonKind::Mirror => {
            vec!["-n".into(), format!("client.mirror.{daemon_id}"), "-f".into()]
        }
        DaemonKind::Crash => vec!["-n".into(), format!("client.crash.{daemon_id}")],
        DaemonKind::Nfs => vec!["-F".into(), "-L".into(), "STDERR".into()],
        DaemonKind::Prometheus => vec![
            "--config.file=/etc/prometheus/prometheus.yml".into(),
            "--storage.tsdb.path=/prometheus".into(),
            "--web.listen-address=:9095".into(),
        ],
        DaemonKind::NodeExporter => vec!["--no-collector.timex".into()],
        DaemonKind::Alertmanager => {
            let mut args = vec![
                "--config.file=/etc/alertmanager/alertmanager.yml".into(),
                "--web.listen-address=:9093".into(),
                "--cluster.listen-address=:9094".into(),
            ];
            for peer in config.str_list("peers") {
                args.push(format!("--cluster.peer={peer}"));
            }
            args
        }
        DaemonKind::SnmpGateway => {
            let mut args = vec!["--web.listen-address=:9464".into()];
            if let Some(dest) = config.str_arg("destination") {
                args.push(format!("--snmp.destination={dest}"));
            }
            if let Some(version) = config.str_arg("snmp_version") {
                args.push(format!("--snmp.version={version}"));
            }
            args
        }
        DaemonKind::Haproxy => {
            vec!["-f".into(), "/var/lib/haproxy/haproxy.cfg".into()]
        }
        DaemonKind::Iscsi
        | DaemonKind::Keepalived
        | DaemonKind::Grafana
        | DaemonKind::Container
        | DaemonKind::Agent => Vec::new(),
    };
    args.extend(config.args.iter().cloned());
    args
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
