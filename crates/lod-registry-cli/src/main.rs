//! lodctl
//!
//! Operator command line for the LOD Chain Registry. Each invocation wires the
//! configured chain store and catalog, runs one registry operation and prints
//! the result as pretty JSON on stdout.

mod commands;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use commands::Command;
use config::{CliConfig, StorageBackend};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Chain storage backend
    #[arg(long, value_enum)]
    backend: Option<StorageBackend>,

    /// Chain directory for the json-file backend
    #[arg(long, env = "LODCTL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Collection catalog manifest
    #[arg(long, env = "LODCTL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Maximum wait for a collection lock, in milliseconds
    #[arg(long)]
    lock_timeout_ms: Option<u64>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = CliConfig::load(&args.config_dir, &args.environment).with_context(|| {
        format!(
            "Failed to load configuration from {} ({})",
            args.config_dir, args.environment
        )
    })?;

    // Override with command-line arguments
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.path = data_dir;
    }
    if let Some(catalog) = args.catalog {
        config.catalog.manifest = Some(catalog);
    }
    if let Some(lock_timeout_ms) = args.lock_timeout_ms {
        config.registry.lock_timeout_ms = lock_timeout_ms;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    telemetry::init_with_config(telemetry::TelemetryConfig::from(&config.logging));

    info!("Environment: {}", args.environment);
    debug!(?config, "Configuration loaded");

    let registry = commands::build_registry(&config).await?;
    let output = commands::run(registry.as_ref(), args.command).await?;

    let rendered = serde_json::to_string_pretty(&output).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}
