//! # latchkey entry point
//!
//! Parses command-line arguments, initializes logging and dispatches to the
//! subcommand handlers in [`latchkey_cli::commands`].

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use latchkey_cli::commands::{self, CheckConfigArgs, RunArgs};

/// RFID door controller.
///
/// Reads card identifiers from a serial reader, authorizes them against a
/// local allow-list and an optional remote authority, and drives the lock.
#[derive(Parser, Debug)]
#[command(name = "latchkey", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Without it, `RUST_LOG` is honored.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the door controller until Ctrl-C.
    Run(RunArgs),

    /// Validate a configuration file.
    CheckConfig(CheckConfigArgs),

    /// Print the default configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("latchkey v{} starting", latchkey_core::VERSION);

    let result = match cli.command {
        Commands::Run(args) => commands::run(&args).await,
        Commands::CheckConfig(args) => commands::check_config(&args).map(|summary| {
            println!("{summary}");
        }),
        Commands::DefaultConfig => commands::default_config().map(|toml| {
            print!("{toml}");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
