// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory, reentrant, per-cluster file lock.
//!
//! Serializes every engine operation touching one cluster's state across
//! processes on this host. Within a process, nested acquires count; the
//! file lock is dropped only when the outermost hold is released.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use silo_core::cluster::ClusterId;
use silo_core::error::{Error, Result};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the file lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    /// Block until acquired.
    Forever,
    /// One `try_lock`, no waiting.
    Once,
    /// Poll until the deadline.
    For(Duration),
}

/// Cross-process cluster lock with in-process reentrance.
#[derive(Debug)]
pub struct ClusterLock {
    path: PathBuf,
    file: Option<File>,
    depth: u32,
}

impl ClusterLock {
    pub fn new(lock_dir: &Path, cluster: &ClusterId) -> Self {
        Self {
            path: lock_dir.join(format!("{}.lock", cluster)),
            file: None,
            depth: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn held(&self) -> bool {
        self.depth > 0
    }

    /// Acquire the lock, polling every 50 ms until `wait` runs out.
    /// Nested acquires on an already-held lock return immediately.
    pub async fn acquire(&mut self, wait: LockWait) -> Result<()> {
        if self.depth > 0 {
            self.depth += 1;
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let deadline = match wait {
            LockWait::For(timeout) => Some(std::time::Instant::now() + timeout),
            LockWait::Forever | LockWait::Once => None,
        };
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) => {
                    let expired = match wait {
                        LockWait::Once => true,
                        LockWait::Forever => false,
                        LockWait::For(_) => {
                            deadline.is_some_and(|d| std::time::Instant::now() >= d)
                        }
                    };
                    if expired {
                        return Err(Error::LockTimeout { path: self.path.clone() });
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
        debug!(path = %self.path.display(), "cluster lock acquired");
        self.file = Some(file);
        self.depth = 1;
        Ok(())
    }

    /// Release one hold. The file unlocks at depth zero; releasing an
    /// unheld lock is a no-op.
    pub fn release(&mut self) {
        match self.depth {
            0 => {}
            1 => {
                self.depth = 0;
                if let Some(file) = self.file.take() {
                    // Dropping the handle releases the advisory lock even
                    // if the explicit unlock fails.
                    let _ = fs2::FileExt::unlock(&file);
                    debug!(path = %self.path.display(), "cluster lock released");
                }
            }
            _ => self.depth -= 1,
        }
    }
}

impl Drop for ClusterLock {
    fn drop(&mut self) {
        self.depth = self.depth.min(1);
        self.release();
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
