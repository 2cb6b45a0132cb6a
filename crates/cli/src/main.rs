// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! siloadm: bootstrap and lifecycle agent for containerized Silo
//! storage clusters, one host at a time.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use silo_core::compose::{RuntimeInfo, RuntimeKind, RuntimeVersion};
use silo_core::registry;
use silo_engine::{Engine, EngineCtx, Services};
use silo_host::engine::ShellEngine;
use silo_host::layout::Layout;
use silo_host::systemd::Systemctl;
use silo_host::{exec, firewall};
use tracing_subscriber::EnvFilter;

/// Environment override for the default container image.
const IMAGE_ENV: &str = "SILOADM_IMAGE";

const BUILD_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Parser)]
#[command(name = "siloadm", version = BUILD_VERSION)]
#[command(about = "Bootstrap and manage containerized Silo storage daemons on this host")]
pub struct Cli {
    /// Container image for storage daemons.
    #[arg(long, global = true)]
    pub image: Option<String>,

    /// Use the Docker runtime instead of Podman.
    #[arg(long, global = true)]
    pub docker: bool,

    #[arg(long, global = true, default_value = "/var/lib/silo")]
    pub data_dir: PathBuf,

    #[arg(long, global = true, default_value = "/var/log/silo")]
    pub log_dir: PathBuf,

    #[arg(long, global = true, default_value = "/etc/logrotate.d")]
    pub logrotate_dir: PathBuf,

    #[arg(long, global = true, default_value = "/etc/sysctl.d")]
    pub sysctl_dir: PathBuf,

    #[arg(long, global = true, default_value = "/etc/systemd/system")]
    pub unit_dir: PathBuf,

    #[arg(long, global = true, default_value = "/run/siloadm")]
    pub lock_dir: PathBuf,

    /// Show debug-level logging and full error chains.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Timeout for external commands, seconds.
    #[arg(long, global = true, default_value = "900")]
    pub timeout: u64,

    /// Attempts for known-transient container runtime failures.
    #[arg(long, global = true, default_value = "3")]
    pub retry: u32,

    /// Extra KEY=VALUE environment for spawned containers.
    #[arg(long = "env", global = true)]
    pub envs: Vec<String>,

    /// Do not run containers under an init process.
    #[arg(long, global = true)]
    pub no_container_init: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the siloadm version
    Version,
    /// Pull the configured image
    Pull,
    /// Inspect the configured image
    InspectImage,
    /// List daemons on this host
    Ls,
    /// List host networks as JSON
    ListNetworks,
    /// Gather host facts as JSON
    GatherFacts,
    /// Adopt a package-manager daemon into the managed layout
    Adopt(commands::adopt::AdoptArgs),
    /// Remove one daemon
    RmDaemon(commands::remove::RmDaemonArgs),
    /// Remove an entire cluster from this host
    RmCluster(commands::remove::RmClusterArgs),
    /// Run a daemon container in the foreground
    Run(commands::unit::NamedArgs),
    /// Open an interactive shell in a fresh container
    Shell(commands::unit::ShellArgs),
    /// Enter a running daemon container
    Enter(commands::unit::NamedArgs),
    /// Run silo-volume inside a transient container
    Volume(commands::unit::PassthroughArgs),
    /// Destroy this cluster's OSD devices
    ZapOsds(commands::remove::ZapOsdsArgs),
    /// Operate one daemon's systemd unit
    Unit(commands::unit::UnitArgs),
    /// Show a daemon's journal
    Logs(commands::unit::LogsArgs),
    /// Bootstrap a new cluster on this host
    Bootstrap(commands::bootstrap::BootstrapArgs),
    /// Deploy or reconfigure one daemon
    Deploy(commands::deploy::DeployArgs),
    /// Check host suitability
    CheckHost,
    /// Prepare this host (no-op here; handled by the package installer)
    PrepareHost,
    /// Configure a package repository (unsupported in container deployments)
    AddRepo,
    /// Remove a package repository (unsupported in container deployments)
    RmRepo,
    /// Install packages (unsupported in container deployments)
    Install,
    /// Log in to an authenticated registry
    RegistryLogin(commands::host::RegistryLoginArgs),
    /// Enter or leave host maintenance mode
    HostMaintenance(commands::host::MaintenanceArgs),
    /// Run the persistent per-host agent
    Agent(commands::agent::AgentArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the runtime, probing its version for the unit-style gate.
async fn detect_runtime(cli: &Cli) -> RuntimeInfo {
    let (kind, binary) = if cli.docker {
        (RuntimeKind::Docker, "/usr/bin/docker")
    } else {
        (RuntimeKind::Podman, "/usr/bin/podman")
    };
    let mut runtime = RuntimeInfo::new(kind, binary);
    let argv = vec![binary.to_string(), "--version".to_string()];
    if let Ok(out) = exec::run(&argv, Duration::from_secs(10)).await {
        if out.success() {
            if let Ok(version) = out.stdout.parse::<RuntimeVersion>() {
                runtime = runtime.with_version(version);
            }
        }
    }
    runtime
}

async fn build_engine(cli: &Cli) -> Engine {
    let image = cli
        .image
        .clone()
        .or_else(|| std::env::var(IMAGE_ENV).ok())
        .unwrap_or_else(|| registry::DEFAULT_IMAGE.to_string());
    let timeout = Duration::from_secs(cli.timeout);
    let ctx = EngineCtx {
        layout: Layout::new(&cli.data_dir, &cli.log_dir),
        unit_dir: cli.unit_dir.clone(),
        sysctl_dir: cli.sysctl_dir.clone(),
        logrotate_dir: cli.logrotate_dir.clone(),
        lock_dir: cli.lock_dir.clone(),
        config_dir: PathBuf::from("/etc/silo"),
        runtime: detect_runtime(cli).await,
        image,
        timeout,
        retries: cli.retry,
        container_init: !cli.no_container_init,
        envs: cli.envs.clone(),
    };
    let services = Services {
        engine: Arc::new(ShellEngine),
        units: Arc::new(Systemctl::new(timeout)),
        firewall: Arc::from(firewall::detect(Duration::from_secs(30)).await),
    };
    Engine::new(ctx, services)
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let engine = build_engine(&cli).await;
    match cli.command {
        Command::Version => {
            println!("siloadm {BUILD_VERSION}");
            Ok(())
        }
        Command::Pull => commands::image::pull(&engine).await,
        Command::InspectImage => commands::image::inspect(&engine).await,
        Command::Ls => commands::ls::ls(&engine).await,
        Command::ListNetworks => commands::ls::list_networks(&engine).await,
        Command::GatherFacts => commands::ls::gather_facts(),
        Command::Adopt(args) => commands::adopt::adopt(&engine, args).await,
        Command::RmDaemon(args) => commands::remove::rm_daemon(&engine, args).await,
        Command::RmCluster(args) => commands::remove::rm_cluster(&engine, args).await,
        Command::Run(args) => commands::unit::run(&engine, args).await,
        Command::Shell(args) => commands::unit::shell(&engine, args).await,
        Command::Enter(args) => commands::unit::enter(&engine, args).await,
        Command::Volume(args) => commands::unit::volume(&engine, args).await,
        Command::ZapOsds(args) => commands::remove::zap_osds(&engine, args).await,
        Command::Unit(args) => commands::unit::unit(&engine, args).await,
        Command::Logs(args) => commands::unit::logs(&engine, args).await,
        Command::Bootstrap(args) => commands::bootstrap::bootstrap(&engine, args).await,
        Command::Deploy(args) => commands::deploy::deploy(&engine, args).await,
        Command::CheckHost => commands::host::check_host(&engine).await,
        Command::PrepareHost => commands::host::prepare_host(),
        Command::AddRepo | Command::RmRepo | Command::Install => commands::host::unsupported(),
        Command::RegistryLogin(args) => commands::host::registry_login(&engine, args).await,
        Command::HostMaintenance(args) => commands::host::host_maintenance(&engine, args).await,
        Command::Agent(args) => commands::agent::agent(engine, args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);
    if let Err(err) = dispatch(cli).await {
        let code = err
            .downcast_ref::<silo_core::Error>()
            .map(silo_core::Error::exit_code)
            .unwrap_or(1);
        eprintln!("ERROR: {err}");
        if verbose {
            eprintln!("{err:?}");
        }
        std::process::exit(code);
    }
}
