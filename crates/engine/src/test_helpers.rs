// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for engine tests: tempdir-backed context, scripted
//! container engine, recording unit manager and firewall.

use std::os::unix::fs::MetadataExt;
use std::sync::Arc;
use std::time::Duration;

use silo_core::cluster::ClusterId;
use silo_core::compose::{RuntimeInfo, RuntimeKind, RuntimeVersion};
use silo_host::layout::Layout;
use silo_host::test_support::{FakeEngine, RecordingFirewall, RecordingUnits};

use crate::context::{Engine, EngineCtx, Services};

pub struct Fixture {
    pub tmp: tempfile::TempDir,
    pub engine: Engine,
    pub fake: Arc<FakeEngine>,
    pub units: Arc<RecordingUnits>,
    pub firewall: Arc<RecordingFirewall>,
}

pub fn cluster() -> ClusterId {
    ClusterId::parse("00000000-0000-0000-0000-00000000abcd").unwrap()
}

pub fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeEngine::new());
    let units = Arc::new(RecordingUnits::new());
    let firewall = Arc::new(RecordingFirewall::new());

    // The image stat probe answers with the current user so chown is a
    // no-op whoever runs the tests.
    let meta = std::fs::metadata(tmp.path()).unwrap();
    fake.respond_ok("%u %g", &format!("{} {}", meta.uid(), meta.gid()));

    let ctx = EngineCtx {
        layout: Layout::new(tmp.path().join("data"), tmp.path().join("log")),
        unit_dir: tmp.path().join("units"),
        sysctl_dir: tmp.path().join("sysctl.d"),
        logrotate_dir: tmp.path().join("logrotate.d"),
        lock_dir: tmp.path().join("lock"),
        config_dir: tmp.path().join("etc"),
        runtime: RuntimeInfo::new(RuntimeKind::Podman, "/usr/bin/podman")
            .with_version(RuntimeVersion(3, 4, 1)),
        image: "quay.io/silo/silo:v17".to_string(),
        timeout: Duration::from_secs(30),
        retries: 3,
        container_init: true,
        envs: Vec::new(),
    };
    let services = Services {
        engine: fake.clone(),
        units: units.clone(),
        firewall: firewall.clone(),
    };
    Fixture { tmp, engine: Engine::new(ctx, services), fake, units, firewall }
}

/// The current user as a uid/gid pair, matching the scripted stat probe.
pub fn current_owner(fixture: &Fixture) -> (u32, u32) {
    let meta = std::fs::metadata(fixture.tmp.path()).unwrap();
    (meta.uid(), meta.gid())
}
