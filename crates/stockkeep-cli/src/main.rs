//! `stockkeep` command-line tool
//!
//! Loads configuration, opens the store and prints each command's result as
//! pretty JSON on stdout. Logs go to stderr.

mod cli;
mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use stockkeep_core::{StockKeep, StockKeepConfig};

fn load_config(cli: &Cli) -> Result<StockKeepConfig> {
    let mut config = match &cli.config {
        Some(path) => StockKeepConfig::from_toml_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => StockKeepConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.logging.init()?;

    let config = load_config(&cli)?;
    tracing::debug!(?config, "loaded configuration");
    let keep = StockKeep::open(config).await?;

    let output = commands::run(&keep, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
