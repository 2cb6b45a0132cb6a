// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! silo-host: host-level collaborators for siloadm.
//!
//! Everything with a side effect lives here: process execution, the
//! on-disk layout manager, the cross-process cluster lock, and the
//! systemd/firewall/sysctl/logrotate collaborators. The engine composes
//! these; they never call each other.

pub mod engine;
pub mod exec;
pub mod firewall;
pub mod layout;
pub mod lock;
pub mod logrotate;
pub mod sysctl;
pub mod systemd;

pub use engine::{ContainerEngine, ShellEngine};
pub use exec::{run, run_checked, CommandOutput};
pub use firewall::{Firewall, FirewallCmd, NoopFirewall};
pub use layout::Layout;
pub use lock::ClusterLock;
pub use systemd::{Systemctl, UnitManager, UnitState};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
