mod config;
mod invoke;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::invoke::InvokeArgs;

/// courier - invoke backend APIs through the authenticated request pipeline
#[derive(Parser)]
#[command(name = "courier-cli")]
#[command(about = "Invoke backend APIs through the courier request pipeline")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL override (overrides config and environment)
    #[arg(long)]
    base_url: Option<String>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the response envelope as JSON
    Invoke(InvokeArgs),
    /// Print the effective configuration as JSON and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (COURIER__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.base_url.as_deref(), cli.verbose)?;

    logging::init_logging(&config.logging);
    tracing::debug!(base_url = %config.connection.base_url, "configuration loaded");

    match cli.command {
        Commands::Invoke(args) => invoke::run(&config, &args).await,
        Commands::Check => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}
