// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-level one-shots: `check-host`, `prepare-host`, registry login,
//! maintenance mode, and the repo/install stubs that only make sense
//! for package-manager deployments.

use clap::Args;
use silo_core::error::Error;
use silo_engine::Engine;
use silo_host::exec;
use silo_host::systemd::GLOBAL_TARGET;

#[derive(Args)]
pub struct RegistryLoginArgs {
    #[arg(long)]
    pub registry_url: String,

    #[arg(long)]
    pub registry_username: String,

    /// Read from stdin when omitted
    #[arg(long)]
    pub registry_password: Option<String>,
}

#[derive(Args)]
pub struct MaintenanceArgs {
    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// `enter` or `exit`
    pub action: String,
}

/// Verify the pieces a managed host needs: a container runtime, systemd
/// and chrony-style time sync.
pub async fn check_host(engine: &Engine) -> anyhow::Result<()> {
    let mut problems = Vec::new();

    let argv = vec![engine.ctx.runtime.binary_str(), "--version".to_string()];
    match exec::run(&argv, std::time::Duration::from_secs(10)).await {
        Ok(out) if out.success() => println!("container runtime: {}", out.stdout.trim()),
        _ => problems.push(format!("container runtime {} not usable", engine.ctx.runtime.binary_str())),
    }

    let argv = vec!["systemctl".to_string(), "--version".to_string()];
    match exec::run(&argv, std::time::Duration::from_secs(10)).await {
        Ok(out) if out.success() => {
            println!("systemd: {}", out.stdout.lines().next().unwrap_or("").trim())
        }
        _ => problems.push("systemd not available".to_string()),
    }

    if which("chronyd").is_none() && which("ntpd").is_none() {
        problems.push("no time synchronization daemon found".to_string());
    }

    if problems.is_empty() {
        println!("host looks OK");
        Ok(())
    } else {
        Err(Error::InvalidArgs(problems.join("; ")).into())
    }
}

pub fn prepare_host() -> anyhow::Result<()> {
    // Runtime, lvm2 and chrony come from the distro installer; nothing
    // to do on an image-based host.
    println!("host preparation is handled by the OS installer; nothing to do");
    Ok(())
}

pub fn unsupported() -> anyhow::Result<()> {
    Err(Error::InvalidArgs(
        "package repositories are not used by container-managed clusters".into(),
    )
    .into())
}

pub async fn registry_login(engine: &Engine, args: RegistryLoginArgs) -> anyhow::Result<()> {
    let password = match args.registry_password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim_end().to_string()
        }
    };
    let argv = vec![
        engine.ctx.runtime.binary_str(),
        "login".to_string(),
        "-u".to_string(),
        args.registry_username,
        "-p".to_string(),
        password,
        args.registry_url.clone(),
    ];
    silo_host::engine::call_checked(engine.services.engine.as_ref(), &argv, engine.ctx.timeout)
        .await?;
    println!("logged in to {}", args.registry_url);
    Ok(())
}

/// Maintenance mode: stop or start everything under the cluster target.
pub async fn host_maintenance(engine: &Engine, args: MaintenanceArgs) -> anyhow::Result<()> {
    let cluster = silo_core::cluster::ClusterId::parse(&args.fsid)?;
    let target = silo_host::systemd::cluster_target_name(&cluster);
    let units = &engine.services.units;
    match args.action.as_str() {
        "enter" => {
            units.stop(&target).await?;
            units.disable(&target).await?;
            println!("maintenance mode entered; {target} stopped");
        }
        "exit" => {
            units.enable(&target).await?;
            units.start(&target).await?;
            units.start(GLOBAL_TARGET).await?;
            println!("maintenance mode exited; {target} running");
        }
        other => {
            return Err(Error::InvalidArgs(format!(
                "host-maintenance action must be enter or exit, not {other:?}"
            ))
            .into())
        }
    }
    Ok(())
}

fn which(binary: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
