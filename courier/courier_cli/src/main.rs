use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::config::CheckConfigArgs;
use commands::invoke::InvokeArgs;
use commands::shm::ShmProbeArgs;

/// Courier Command Line Interface
///
/// Inspect host configuration, probe shared memory support, and run a single
/// invocation against an in-process worker.
#[derive(Parser)]
#[clap(name = "courier", author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a host configuration file
    #[clap(name = "check-config")]
    CheckConfig(CheckConfigArgs),

    /// Create, reopen and delete a shared memory region
    #[clap(name = "shm-probe")]
    ShmProbe(ShmProbeArgs),

    /// Run one invocation through an in-process echo worker
    Invoke(InvokeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig(args) => commands::config::execute(&args).await,
        Commands::ShmProbe(args) => commands::shm::execute(&args),
        Commands::Invoke(args) => commands::invoke::execute(&args).await,
    }
}
