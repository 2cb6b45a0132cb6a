// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `siloadm run` / `shell` / `enter` / `volume` / `unit` / `logs` -
//! daemon-level conveniences built on the composer.

use std::process::Stdio;

use clap::{Args, Subcommand};
use silo_core::cluster::{ClusterId, DaemonId};
use silo_core::compose::{self, one_shot_cmd, Composer};
use silo_core::error::Error;
use silo_engine::Engine;

#[derive(Args)]
pub struct NamedArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Cluster id
    #[arg(long)]
    pub fsid: String,
}

#[derive(Args)]
pub struct ShellArgs {
    /// Cluster id mounted into the shell when given
    #[arg(long)]
    pub fsid: Option<String>,

    /// Command to run instead of an interactive bash
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args)]
pub struct PassthroughArgs {
    /// Cluster id
    #[arg(long)]
    pub fsid: Option<String>,

    /// Arguments forwarded verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct UnitArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    #[command(subcommand)]
    pub op: UnitOp,
}

#[derive(Subcommand)]
pub enum UnitOp {
    Start,
    Stop,
    Restart,
    Status,
}

#[derive(Args)]
pub struct LogsArgs {
    /// Daemon name, `<kind>.<id>`
    #[arg(long)]
    pub name: String,

    /// Cluster id
    #[arg(long)]
    pub fsid: String,

    /// Extra arguments forwarded to journalctl
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub journalctl_args: Vec<String>,
}

/// Run an argv with inherited stdio and exit with its status.
async fn run_interactive(argv: Vec<String>) -> anyhow::Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::InvalidArgs("empty command".into()))?;
    let status = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await?;
    std::process::exit(status.code().unwrap_or(1));
}

pub async fn run(engine: &Engine, args: NamedArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;
    let composer = Composer::new(&engine.ctx.runtime, &cluster, &daemon, &engine.ctx.image);
    run_interactive(composer.run_cmd().argv).await
}

pub async fn shell(engine: &Engine, args: ShellArgs) -> anyhow::Result<()> {
    let mut volumes = Vec::new();
    if let Some(fsid) = &args.fsid {
        let cluster = ClusterId::parse(fsid)?;
        volumes.push(format!(
            "{}:/var/lib/silo:z",
            engine.ctx.layout.cluster_dir(&cluster).display()
        ));
    }
    let config_dir = &engine.ctx.config_dir;
    if config_dir.is_dir() {
        volumes.push(format!("{}:/etc/silo:z", config_dir.display()));
    }
    let command = if args.command.is_empty() {
        vec!["bash".to_string()]
    } else {
        args.command.clone()
    };
    let rest: Vec<String> = command[1..].to_vec();
    let mut argv = one_shot_cmd(
        &engine.ctx.runtime,
        &engine.ctx.image,
        Some(&command[0]),
        &rest,
        &volumes,
        &engine.ctx.envs,
    );
    // Interactive terminal for the shell itself.
    if let Some(pos) = argv.iter().position(|a| a == "--rm") {
        argv.insert(pos + 1, "-it".to_string());
    }
    run_interactive(argv).await
}

pub async fn enter(engine: &Engine, args: NamedArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;
    let composer = Composer::new(&engine.ctx.runtime, &cluster, &daemon, &engine.ctx.image);
    let mut argv = composer.exec_cmd(&["bash".to_string()]);
    // exec -i becomes -it for a usable terminal.
    if let Some(pos) = argv.iter().position(|a| a == "-i") {
        argv[pos] = "-it".to_string();
    }
    run_interactive(argv).await
}

pub async fn volume(engine: &Engine, args: PassthroughArgs) -> anyhow::Result<()> {
    let mut volumes = vec!["/dev:/dev".to_string(), "/run/udev:/run/udev".to_string()];
    if let Some(fsid) = &args.fsid {
        let cluster = ClusterId::parse(fsid)?;
        volumes.push(format!(
            "{}:/var/lib/silo:z",
            engine.ctx.layout.cluster_dir(&cluster).display()
        ));
    }
    let argv = one_shot_cmd(
        &engine.ctx.runtime,
        &engine.ctx.image,
        Some("/usr/bin/silo-volume"),
        &args.args,
        &volumes,
        &engine.ctx.envs,
    );
    run_interactive(argv).await
}

pub async fn unit(engine: &Engine, args: UnitArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;
    let unit = compose::service_name(&cluster, &daemon);
    let units = &engine.services.units;
    match args.op {
        UnitOp::Start => units.start(&unit).await?,
        UnitOp::Stop => units.stop(&unit).await?,
        UnitOp::Restart => units.restart(&unit).await?,
        UnitOp::Status => {
            println!("{}", units.state(&unit).await.as_str());
        }
    }
    Ok(())
}

pub async fn logs(engine: &Engine, args: LogsArgs) -> anyhow::Result<()> {
    let cluster = ClusterId::parse(&args.fsid)?;
    let daemon = DaemonId::parse(&args.name)?;
    let unit = compose::service_name(&cluster, &daemon);
    let mut argv = vec!["journalctl".to_string(), "-u".to_string(), unit];
    argv.extend(args.journalctl_args.iter().cloned());
    run_interactive(argv).await
}
