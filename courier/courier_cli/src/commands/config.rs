//! Configuration commands

use anyhow::{Context, Result};
use clap::Args;
use courier_runtime::system::HostConfig;

/// Arguments for the check-config command
#[derive(Args)]
pub struct CheckConfigArgs {
    /// Path to the host configuration file
    #[clap(long)]
    pub config: String,
}

/// Load and validate the configuration, then print the effective settings.
pub async fn execute(args: &CheckConfigArgs) -> Result<()> {
    let config = HostConfig::load(Some(&args.config)).await?;

    let rendered =
        serde_json::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);

    Ok(())
}
