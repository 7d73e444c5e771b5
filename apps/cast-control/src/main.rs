//! Cast Control - control Google Cast devices from Linux media controls.
//!
//! `connect` runs in the foreground; `service connect` runs the same loop as
//! a background process that `service disconnect` and `service reconnect`
//! manage.

mod config;
mod logging;
mod service;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use cast_control_core::protocol_constants::{RC_NOT_RUNNING, RC_OK};
use cast_control_core::{
    AppPaths, CastDiscovery, ConnectionSupervisor, DaemonArgs, DefaultIcons, DiscoveryConfig,
    ErrorCode, MprisPublisher,
};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::{ConnectArgs, FileConfig};

/// Cast Control - Google Cast devices as MPRIS media players.
#[derive(Parser, Debug)]
#[command(name = "cast-control")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a device and run in the foreground.
    #[command(disable_help_flag = true)]
    Connect(ConnectArgs),

    /// Manage the background service.
    #[command(subcommand)]
    Service(ServiceCommands),
}

#[derive(Subcommand, Debug)]
enum ServiceCommands {
    /// Connect to a device in the background.
    #[command(disable_help_flag = true)]
    Connect(ConnectArgs),

    /// Disconnect the background service from the device.
    Disconnect,

    /// Reconnect the background service to the device.
    Reconnect,

    /// Background process entry point.
    #[command(hide = true)]
    Run,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let paths = AppPaths::from_env().context("Failed to resolve user directories")?;

    match cli.command {
        Commands::Connect(connect) => {
            let args = resolve(&connect, &paths)?;
            logging::init_stderr(logging::parse_level(&args.log_level));
            serve(args, &paths).await
        }
        Commands::Service(ServiceCommands::Connect(connect)) => {
            let args = resolve(&connect, &paths)?;
            logging::init_stderr(logging::parse_level(&args.log_level));
            service::connect(&paths, &args)?;
            Ok(ExitCode::from(RC_OK))
        }
        Commands::Service(ServiceCommands::Disconnect) => {
            logging::init_stderr(logging::parse_level(config::DEFAULT_LOG_LEVEL));
            service::disconnect(&paths)?;
            Ok(ExitCode::from(RC_OK))
        }
        Commands::Service(ServiceCommands::Reconnect) => {
            logging::init_stderr(logging::parse_level(config::DEFAULT_LOG_LEVEL));
            match service::reconnect(&paths)? {
                service::Reconnect::Restarted => Ok(ExitCode::from(RC_OK)),
                service::Reconnect::NotRunning => Ok(ExitCode::from(RC_NOT_RUNNING)),
            }
        }
        Commands::Service(ServiceCommands::Run) => {
            let Some(args) = DaemonArgs::load(&paths).context("Failed to read service arguments")?
            else {
                eprintln!("Daemon isn't running.");
                return Ok(ExitCode::from(RC_NOT_RUNNING));
            };
            logging::init_file(logging::parse_level(&args.log_level), &paths.log_file())?;

            let pid = std::process::id();
            let code = serve(args, &paths).await;
            service::release_pid(&paths.pid_file(), pid);
            code
        }
    }
}

fn resolve(connect: &ConnectArgs, paths: &AppPaths) -> Result<DaemonArgs> {
    let file = FileConfig::load(connect.config.as_deref(), &paths.config_file())?;
    Ok(connect.resolve(file))
}

/// Runs the supervisor until shutdown or a fatal discovery miss.
async fn serve(args: DaemonArgs, paths: &AppPaths) -> Result<ExitCode> {
    log::info!("Cast Control v{}", env!("CARGO_PKG_VERSION"));

    let identity = args.identity();
    let policy = args.retry_policy();
    log::info!(
        "Configuration: device={}, wait={:?}, retry_wait={:?}",
        identity,
        policy.initial_wait,
        policy.retry_wait
    );

    let (default_art, desktop_entry) = match DefaultIcons::install(paths, args.icon) {
        Ok(icons) => {
            let entry = icons
                .install_desktop_entry(paths)
                .map_err(|e| log::warn!("Failed to install desktop entry: {}", e))
                .ok();
            (Some(icons.art_url()), entry)
        }
        Err(e) => {
            log::warn!("Failed to install default icons: {}", e);
            (None, None)
        }
    };

    let discovery =
        CastDiscovery::new(DiscoveryConfig::default()).context("Failed to start mDNS discovery")?;
    let supervisor = ConnectionSupervisor::new(Arc::new(discovery), Arc::new(MprisPublisher::new()))
        .with_default_art(default_art)
        .with_desktop_entry(desktop_entry);

    let cancel = CancellationToken::new();
    let signal_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            log::info!("Shutdown signal received, cleaning up...");
            cancel.cancel();
        })
    };

    let result = supervisor.run(&identity, policy, cancel).await;
    signal_task.abort();

    match result {
        Ok(()) => {
            log::info!("Shutdown complete");
            Ok(ExitCode::from(RC_OK))
        }
        Err(e) => match e.exit_code() {
            Some(code) => {
                log::error!("{}. ({})", e, e.code());
                eprintln!("{}.", e);
                Ok(ExitCode::from(code))
            }
            None => Err(e).context("Connection supervisor failed"),
        },
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
