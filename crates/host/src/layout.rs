// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout manager.
//!
//! Owns every filesystem state transition under the data and log roots.
//! File publication is atomic with respect to readers: content goes to
//! `<path>.new`, gets its final mode and owner while still private, and
//! is renamed over the destination. Directories are created with an
//! explicit mode and re-chmodded after chown to defeat the umask.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use chrono::Utc;
use nix::unistd::{chown, fchown, Gid, Uid};
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::error::Result;

/// Daemon data dirs and the files under them.
pub const DATA_DIR_MODE: u32 = 0o700;
/// Every `unit.*` artifact plus config/keyring.
pub const FILE_MODE: u32 = 0o600;

pub const UNIT_RUN: &str = "unit.run";
pub const UNIT_STOP: &str = "unit.stop";
pub const UNIT_POSTSTOP: &str = "unit.poststop";
pub const UNIT_IMAGE: &str = "unit.image";
pub const UNIT_META: &str = "unit.meta";
pub const UNIT_CREATED: &str = "unit.created";
pub const UNIT_CONFIGURED: &str = "unit.configured";

/// The six artifacts that must exist together after a successful deploy.
pub const UNIT_ARTIFACTS: &[&str] =
    &[UNIT_RUN, UNIT_STOP, UNIT_POSTSTOP, UNIT_IMAGE, UNIT_META, UNIT_CONFIGURED];

/// Host data/log tree for all clusters.
#[derive(Debug, Clone)]
pub struct Layout {
    pub data_root: PathBuf,
    pub log_root: PathBuf,
}

impl Layout {
    pub fn new(data_root: impl Into<PathBuf>, log_root: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into(), log_root: log_root.into() }
    }

    pub fn cluster_dir(&self, cluster: &ClusterId) -> PathBuf {
        self.data_root.join(cluster.as_str())
    }

    pub fn daemon_dir(&self, cluster: &ClusterId, daemon: &DaemonId) -> PathBuf {
        self.cluster_dir(cluster).join(daemon.to_string())
    }

    pub fn crash_posted_dir(&self, cluster: &ClusterId) -> PathBuf {
        self.cluster_dir(cluster).join("crash").join("posted")
    }

    pub fn removed_dir(&self, cluster: &ClusterId) -> PathBuf {
        self.cluster_dir(cluster).join("removed")
    }

    pub fn log_dir(&self, cluster: &ClusterId) -> PathBuf {
        self.log_root.join(cluster.as_str())
    }

    /// Create the daemon's data dir tree, the crash spool and the log
    /// dir, all owned by the daemon.
    pub fn make_daemon_dirs(
        &self,
        cluster: &ClusterId,
        daemon: &DaemonId,
        owner: Option<(u32, u32)>,
    ) -> Result<PathBuf> {
        let dir = self.daemon_dir(cluster, daemon);
        makedirs(&self.cluster_dir(cluster), DATA_DIR_MODE, owner)?;
        makedirs(&dir, DATA_DIR_MODE, owner)?;
        makedirs(&self.crash_posted_dir(cluster), DATA_DIR_MODE, owner)?;
        makedirs(&self.log_dir(cluster), 0o770, owner)?;
        Ok(dir)
    }

    /// Name under `removed/` for a backed-up daemon dir.
    pub fn backup_name(daemon: &DaemonId) -> String {
        format!("{}_{}", daemon, Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }

    /// Enumerate `<kind>.<id>` dirs for one cluster. Entries that do not
    /// parse as daemon names (crash, removed, ...) are skipped.
    pub fn daemon_dirs(&self, cluster: &ClusterId) -> Result<Vec<(DaemonId, PathBuf)>> {
        let dir = self.cluster_dir(cluster);
        let mut found = Vec::new();
        if !dir.is_dir() {
            return Ok(found);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Ok(daemon) = DaemonId::parse(name) {
                found.push((daemon, entry.path()));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Cluster ids present under the data root.
    pub fn clusters(&self) -> Result<Vec<ClusterId>> {
        let mut found = Vec::new();
        if !self.data_root.is_dir() {
            return Ok(found);
        }
        for entry in fs::read_dir(&self.data_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = ClusterId::parse(name) {
                    found.push(id);
                }
            }
        }
        found.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(found)
    }
}

/// Atomically publish `content` at `path` with the given mode and owner.
pub fn write_file(
    path: &Path,
    content: &[u8],
    mode: u32,
    owner: Option<(u32, u32)>,
) -> Result<()> {
    let tmp = PathBuf::from(format!("{}.new", path.display()));
    let mut file =
        OpenOptions::new().write(true).create(true).truncate(true).open(&tmp)?;
    file.write_all(content)?;
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    if let Some((uid, gid)) = owner {
        fchown(file.as_raw_fd(), Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(std::io::Error::from)?;
    }
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

/// `mkdir -p` with explicit mode; chown before chmod so the final bits
/// survive the umask.
pub fn makedirs(path: &Path, mode: u32, owner: Option<(u32, u32)>) -> Result<()> {
    fs::create_dir_all(path)?;
    if let Some((uid, gid)) = owner {
        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(std::io::Error::from)?;
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// Recursive chown, following the tree but not symlinks.
pub fn recursive_chown(path: &Path, uid: u32, gid: u32) -> Result<()> {
    chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
        .map_err(std::io::Error::from)?;
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_symlink() {
                continue;
            }
            recursive_chown(&entry.path(), uid, gid)?;
        }
    }
    Ok(())
}

/// Create `path` if absent, leaving an existing file untouched. Used for
/// `unit.created`, whose timestamp must never move.
pub fn touch_once(path: &Path, owner: Option<(u32, u32)>) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    write_file(path, b"", FILE_MODE, owner)
}

/// Create or rewrite `path`, bumping its mtime. Used for
/// `unit.configured` on every (re)deploy.
pub fn touch(path: &Path, owner: Option<(u32, u32)>) -> Result<()> {
    write_file(path, b"", FILE_MODE, owner)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
