//! The `gappsd` daemon binary: parses `--config-file`/`--verbose`, wires
//! up the store/client singletons, and runs the supervisor until it asks
//! to shut down, restart, or go quiescent.

use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use gappsd::{bootstrap, init_logging};
use gappsd_core::supervisor::{Supervisor, SupervisorExit};

#[derive(Parser)]
#[command(name = "gappsd", about = "Google Workspace directory provisioning daemon")]
struct Args {
    /// Path to the gappsd INI configuration file.
    #[arg(short = 'c', long = "config-file")]
    config_file: String,

    /// Raise log verbosity to debug.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let bootstrap = match bootstrap(&args.config_file).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = init_logging(&bootstrap.config, args.verbose);

    info!(config_file = %args.config_file, "gappsd starting up");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, flushing and exiting cleanly");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut supervisor = Supervisor::new(
        bootstrap.store.clone(),
        bootstrap.registry.clone(),
        bootstrap.deps.clone(),
        bootstrap.config.max_run_time,
    );

    match supervisor.run(shutdown_rx).await {
        SupervisorExit::CleanShutdown => {
            info!("gappsd exiting cleanly");
            ExitCode::SUCCESS
        }
        SupervisorExit::RestartRequested => {
            info!("gappsd requesting a rolling restart (max-run-time reached)");
            // No in-process execvp (§9): a thin parent/init system is
            // expected to restart us on this exit code.
            ExitCode::from(75)
        }
        SupervisorExit::BackupMode => {
            error!(critical = true, "gappsd entered backup mode and was killed externally");
            ExitCode::FAILURE
        }
    }
}
