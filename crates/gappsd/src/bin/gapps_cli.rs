//! The `gapps-cli` admin console binary (C8): drains the admin-only
//! partition (`p_admin_request = true`) one row at a time, rendering each
//! job's long form and asking the operator to confirm before it runs to
//! completion in privileged mode. The password prompt is a local operator
//! confirmation gate in front of the service-account credentials already
//! loaded from the config file.

use std::process::ExitCode;

use clap::Parser;
use console::style;
use dialoguer::{Confirm, Password};
use tracing::info;

use gappsd::bootstrap;
use gappsd_core::admin::{poll_admin_partition, AdminPoll};

#[derive(Parser)]
#[command(name = "gapps-cli", about = "Out-of-band admin console for parked gappsd jobs")]
struct Args {
    /// Path to the gappsd INI configuration file.
    #[arg(short = 'c', long = "config-file")]
    config_file: String,

    /// Administrator email, used only as a local confirmation gate before
    /// draining the admin partition.
    #[arg(short = 'a', long = "admin-email")]
    admin_email: String,
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
    tracing_subscriber::fmt().init();

    let password = Password::new()
        .with_prompt(format!("{}'s password", args.admin_email))
        .interact();
    if password.is_err() {
        eprintln!("Error: a password is required to run the admin console.");
        return ExitCode::FAILURE;
    }
    info!(admin_email = %args.admin_email, "admin console session started");

    loop {
        let poll = poll_admin_partition(&bootstrap.registry, bootstrap.store.clone(), bootstrap.deps.clone()).await;
        let pending = match poll {
            Ok(AdminPoll::Empty) => {
                println!("No admin request left, terminating.");
                return ExitCode::SUCCESS;
            }
            Ok(AdminPoll::Skipped) => continue,
            Ok(AdminPoll::Ready(pending)) => pending,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        };

        println!("{}", style(pending.describe_short()).bold());
        println!("{}", pending.describe_long());

        let confirmed = Confirm::new()
            .with_prompt("Run this job?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmed {
            println!("Skipping; exiting.");
            return ExitCode::SUCCESS;
        }

        if let Err(e) = pending.execute().await {
            eprintln!("Job did not complete cleanly: {e}");
        }
    }
}
