// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared by every spec.

use std::path::Path;

use assert_cmd::Command;

pub const FSID: &str = "00000000-0000-0000-0000-00000000abcd";

/// A throwaway host: data, log, unit, sysctl, logrotate and lock roots
/// under one tempdir.
pub struct Host {
    pub tmp: tempfile::TempDir,
}

impl Host {
    pub fn new() -> Self {
        Self { tmp: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    /// A `siloadm` invocation with every root pointed into the tempdir.
    pub fn siloadm(&self, args: &[&str]) -> Spec {
        let mut cmd = Command::cargo_bin("siloadm").expect("siloadm binary");
        cmd.arg("--data-dir")
            .arg(self.path().join("data"))
            .arg("--log-dir")
            .arg(self.path().join("log"))
            .arg("--unit-dir")
            .arg(self.path().join("units"))
            .arg("--sysctl-dir")
            .arg(self.path().join("sysctl.d"))
            .arg("--logrotate-dir")
            .arg(self.path().join("logrotate.d"))
            .arg("--lock-dir")
            .arg(self.path().join("lock"))
            .arg("--timeout")
            .arg("30");
        cmd.args(args);
        Spec { cmd }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// One command invocation plus fluent assertions over its result.
pub struct Spec {
    cmd: Command,
}

pub struct SpecResult {
    pub stdout: String,
    pub stderr: String,
}

impl Spec {
    fn run(mut self) -> (std::process::Output, SpecResult) {
        let output = self.cmd.output().expect("spawn siloadm");
        let result = SpecResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        (output, result)
    }

    /// Expect exit 0.
    pub fn passes(self) -> SpecResult {
        let (output, result) = self.run();
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            result.stdout,
            result.stderr
        );
        result
    }

    /// Expect a specific non-zero exit code.
    pub fn fails(self, code: i32) -> SpecResult {
        let (output, result) = self.run();
        assert_eq!(
            output.status.code(),
            Some(code),
            "stdout: {}\nstderr: {}",
            result.stdout,
            result.stderr
        );
        result
    }
}

impl SpecResult {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}:\n{}", self.stdout);
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}:\n{}", self.stderr);
        self
    }

    pub fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).expect("stdout is JSON")
    }
}
