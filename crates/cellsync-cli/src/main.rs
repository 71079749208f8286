mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cellsync_drive::DriveClient;
use cellsync_warehouse::Warehouse;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, DRIVE_TOKEN_VAR};

#[derive(Parser)]
#[command(name = "cellsync")]
#[command(about = "Sync vendor traffic exports from Drive and load them into the warehouse")]
struct Cli {
    /// Config file (defaults to ~/.config/cellsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mirror remote folders into the local staging directories
    Sync,
    /// Load staged vendor archives into the traffic tables
    Ingest {
        /// Only run the job for this table
        #[arg(long)]
        table: Option<String>,
    },
    /// Sync, then ingest every configured table
    Run,
    /// Bulk-copy a CSV file whose header names the table's columns
    LoadCsv {
        /// CSV file to load
        file: PathBuf,
        /// Target table
        #[arg(long)]
        table: String,
    },
}

fn drive_client(config: &AppConfig) -> DriveClient {
    let token = std::env::var(DRIVE_TOKEN_VAR).ok();
    if token.is_none() {
        tracing::warn!("{DRIVE_TOKEN_VAR} is not set, Drive requests are unauthenticated");
    }
    DriveClient::new(token, config.drive.api_base_url.clone())
}

fn open_warehouse(config: &AppConfig) -> Result<Warehouse> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Warehouse::open(&path).with_context(|| format!("failed to open warehouse at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Sync => {
            commands::sync::run(&config, &drive_client(&config)).await?;
            Ok(())
        }
        Command::Ingest { table } => {
            let mut warehouse = open_warehouse(&config)?;
            commands::ingest::run(&config, &mut warehouse, table.as_deref())?;
            Ok(())
        }
        Command::Run => {
            commands::sync::run(&config, &drive_client(&config)).await?;
            let mut warehouse = open_warehouse(&config)?;
            commands::ingest::run(&config, &mut warehouse, None)?;
            Ok(())
        }
        Command::LoadCsv { file, table } => {
            let mut warehouse = open_warehouse(&config)?;
            commands::load_csv::run(&mut warehouse, &file, &table)?;
            Ok(())
        }
    }
}
