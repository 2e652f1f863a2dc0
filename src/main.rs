// ABOUTME: CLI entry point for pg-tablesync
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use pg_tablesync::commands;
use pg_tablesync::config::SyncConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pg-tablesync")]
#[command(about = "Point-in-time PostgreSQL table synchronization using per-row hash diffing", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize tables from source to target
    Sync {
        /// Source database connection URL
        #[arg(long)]
        source: String,
        /// Target database connection URL
        #[arg(long)]
        target: String,
        /// Tables to synchronize (comma-separated or repeated)
        #[arg(long, value_delimiter = ',', required = true)]
        table: Vec<String>,
        /// Path to a TOML config file (hash column, batch size, ...)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for dump files (overrides config)
        #[arg(long)]
        dump_dir: Option<PathBuf>,
        /// Maximum hashes per DELETE statement (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,
        /// Column holding the per-row content hash (overrides config)
        #[arg(long)]
        hash_column: Option<String>,
        /// Skip tables whose row count and max-modified timestamp match
        #[arg(long)]
        change_detection: bool,
        /// Truncate the destination and recopy everything instead of diffing
        #[arg(long)]
        full: bool,
    },
    /// Report per-table row counts and modification timestamps on both hosts
    Status {
        /// Source database connection URL
        #[arg(long)]
        source: String,
        /// Target database connection URL
        #[arg(long)]
        target: String,
        /// Tables to report on (comma-separated or repeated)
        #[arg(long, value_delimiter = ',', required = true)]
        table: Vec<String>,
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path),
        None => Ok(SyncConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            source,
            target,
            table,
            config,
            dump_dir,
            batch_size,
            hash_column,
            change_detection,
            full,
        } => {
            let mut sync_config = load_config(config.as_ref())?;
            if let Some(dir) = dump_dir {
                sync_config.dump_dir = dir;
            }
            if let Some(size) = batch_size {
                anyhow::ensure!(size > 0, "--batch-size must be greater than zero");
                sync_config.delete_batch_size = size;
            }
            if let Some(column) = hash_column {
                sync_config.hash_column = column;
            }
            if change_detection {
                sync_config.change_detection = true;
            }
            if full {
                sync_config.full_reload = true;
            }

            commands::sync(&source, &target, &table, &sync_config).await
        }
        Commands::Status {
            source,
            target,
            table,
            config,
        } => {
            let sync_config = load_config(config.as_ref())?;
            commands::status(&source, &target, &table, &sync_config).await
        }
    }
}
