//! # cvault CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cvault_cli::keygen::{run_keygen, KeygenArgs};
use cvault_cli::load_config;
use cvault_cli::simulate::{run_simulate, SimulateArgs};

/// Confidential time-locked vault toolchain.
///
/// Generates decryption authority keys and runs scripted stake lifecycles
/// against an in-process vault.
#[derive(Parser, Debug)]
#[command(name = "cvault", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML vault configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the x25519 sealing key and Ed25519 authority signing keys.
    Keygen(KeygenArgs),

    /// Run a YAML lifecycle scenario.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::debug!("cvault CLI starting");

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Simulate(args) => {
            load_config(cli.config.as_deref()).and_then(|config| run_simulate(&args, config))
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
