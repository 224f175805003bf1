//! o365cal - Office 365 calendar in the terminal
//!
//! Signs in to Microsoft Graph with the OAuth2 device-code flow and prints upcoming events.

#![deny(clippy::all)]

mod auth;
mod calendar;
mod cli;
mod clock;
mod commands;
mod config;
mod error;
mod store;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::App;
use config::Config;
use error::AppError;

/// Exit status when the user has to run `auth` first.
const EXIT_SIGN_IN_REQUIRED: u8 = 2;
/// Exit status for every other failure.
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    init_logging();

    let cli = Cli::parse();
    debug!("Starting o365cal v{} ({:?})", env!("CARGO_PKG_VERSION"), cli.command);

    // One invocation runs one command to completion
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Command failed: {:?}", e);
            eprintln!("{}", failure_message(&e));
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Initialize tracing/logging. Logs go to stderr so stdout only carries command output.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

async fn run(command: Command) -> Result<()> {
    let config = Config::load().map_err(AppError::from)?;
    let app = App::new(&config).context("Failed to initialize")?;

    match command {
        Command::Auth { open } => app.auth(open).await?,
        Command::Status => app.status().await?,
        Command::Today => app.today().await?,
        Command::Tomorrow => app.tomorrow().await?,
        Command::Upcoming { days } => app.upcoming(days).await?,
    }

    Ok(())
}

/// The single stderr line printed for a failed command.
fn failure_message(err: &anyhow::Error) -> String {
    format!("Error: {:#}", err)
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Auth(e)) if e.requires_sign_in() => EXIT_SIGN_IN_REQUIRED,
        _ => EXIT_FAILURE,
    }
}
