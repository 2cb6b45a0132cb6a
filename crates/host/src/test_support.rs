// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted collaborators for engine and bootstrap tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use silo_core::error::Result;

use crate::engine::ContainerEngine;
use crate::exec::CommandOutput;
use crate::firewall::Firewall;
use crate::systemd::{UnitManager, UnitState};

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput { stdout: stdout.to_string(), stderr: String::new(), code: 0 }
}

/// A container engine that records calls and replays scripted outputs.
///
/// Responses are keyed by substring match against the joined argv; the
/// longest matching key wins. Unmatched calls succeed with empty output.
#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<Vec<(String, CommandOutput)>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output for any call whose joined argv contains `key`.
    pub fn respond(&self, key: &str, out: CommandOutput) {
        self.responses.lock().push((key.to_string(), out));
    }

    pub fn respond_ok(&self, key: &str, stdout: &str) {
        self.respond(key, ok(stdout));
    }

    pub fn respond_fail(&self, key: &str, stderr: &str, code: i32) {
        self.respond(
            key,
            CommandOutput { stdout: String::new(), stderr: stderr.to_string(), code },
        );
    }

    /// All recorded calls whose joined argv contains `needle`.
    pub fn calls_containing(&self, needle: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|argv| argv.join(" ").contains(needle))
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn call(&self, argv: &[String], _timeout: Duration) -> Result<CommandOutput> {
        self.calls.lock().push(argv.to_vec());
        let joined = argv.join(" ");
        let responses = self.responses.lock();
        let best = responses
            .iter()
            .filter(|(key, _)| joined.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len());
        Ok(best.map(|(_, out)| out.clone()).unwrap_or_else(|| ok("")))
    }
}

/// A unit manager that records operations instead of running systemctl.
#[derive(Default)]
pub struct RecordingUnits {
    pub ops: Mutex<Vec<(String, String)>>,
    pub enabled: Mutex<HashMap<String, bool>>,
    pub states: Mutex<HashMap<String, UnitState>>,
    /// Units whose start should fail.
    pub failing_starts: Mutex<Vec<String>>,
}

impl RecordingUnits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, unit: &str, state: UnitState) {
        self.states.lock().insert(unit.to_string(), state);
    }

    pub fn ops_for(&self, unit: &str) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter(|(_, u)| u == unit)
            .map(|(op, _)| op.clone())
            .collect()
    }

    fn record(&self, op: &str, unit: &str) {
        self.ops.lock().push((op.to_string(), unit.to_string()));
    }
}

#[async_trait]
impl UnitManager for RecordingUnits {
    async fn daemon_reload(&self) -> Result<()> {
        self.record("daemon-reload", "");
        Ok(())
    }

    async fn enable(&self, unit: &str) -> Result<()> {
        self.record("enable", unit);
        self.enabled.lock().insert(unit.to_string(), true);
        Ok(())
    }

    async fn disable(&self, unit: &str) -> Result<()> {
        self.record("disable", unit);
        self.enabled.lock().insert(unit.to_string(), false);
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.record("start", unit);
        if self.failing_starts.lock().iter().any(|u| u == unit) {
            self.states.lock().insert(unit.to_string(), UnitState::Error);
            return Err(silo_core::Error::ProcessFailed {
                cmd: format!("systemctl start {unit}"),
                stdout: String::new(),
                stderr: "Job failed".to_string(),
                code: 1,
            });
        }
        self.states.lock().insert(unit.to_string(), UnitState::Running);
        Ok(())
    }

    async fn stop(&self, unit: &str) -> Result<()> {
        self.record("stop", unit);
        self.states.lock().insert(unit.to_string(), UnitState::Stopped);
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<()> {
        self.record("restart", unit);
        self.states.lock().insert(unit.to_string(), UnitState::Running);
        Ok(())
    }

    async fn reset_failed(&self, unit: &str) -> Result<()> {
        self.record("reset-failed", unit);
        Ok(())
    }

    async fn is_enabled(&self, unit: &str) -> bool {
        *self.enabled.lock().get(unit).unwrap_or(&false)
    }

    async fn state(&self, unit: &str) -> UnitState {
        *self.states.lock().get(unit).unwrap_or(&UnitState::Unknown)
    }
}

/// A firewall that records opens/closes/reloads.
#[derive(Default)]
pub struct RecordingFirewall {
    pub opened_services: Mutex<Vec<String>>,
    pub opened_ports: Mutex<Vec<u16>>,
    pub closed_ports: Mutex<Vec<u16>>,
    pub reloads: Mutex<usize>,
}

impl RecordingFirewall {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Firewall for RecordingFirewall {
    async fn open_service(&self, service: &str) {
        self.opened_services.lock().push(service.to_string());
    }

    async fn open_ports(&self, ports: &[u16]) {
        self.opened_ports.lock().extend_from_slice(ports);
    }

    async fn close_ports(&self, ports: &[u16]) {
        self.closed_ports.lock().extend_from_slice(ports);
    }

    async fn apply(&self) {
        *self.reloads.lock() += 1;
    }
}
