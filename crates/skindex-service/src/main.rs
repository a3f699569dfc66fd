//! Skin index valuation service - Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use skindex_core::IndexId;
use skindex_service::{AppConfig, Application};
use tracing::{info, warn};

/// Skin index price sync and valuation service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SKINDEX_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync the catalog, regenerate prebuilt indices, then value on schedule (default)
    Run,
    /// Sync the catalog and regenerate prebuilt indices once
    Sync,
    /// Run the startup sequence, then value indices once
    Value {
        /// Only value this index
        #[arg(long)]
        index: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it may carry the log filter.
    let config_path = AppConfig::resolve_path(args.config.as_deref());
    let config_found = config_path.exists();
    let config = AppConfig::load(&config_path)?;

    skindex_telemetry::init_logging(config.telemetry.log_filter.as_deref())?;

    info!("Starting skindex v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!(config_path = %config_path.display(), "Configuration loaded");
    } else {
        warn!(config_path = %config_path.display(), "Config file not found, using defaults");
    }

    let app = Application::new(config)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => app.run().await?,
        Command::Sync => {
            let report = app.startup().await?;
            println!(
                "catalog: {} added, {} updated, {} unchanged, {} failed (pages failed: {:?}) in {:?}",
                report.sync.added,
                report.sync.updated,
                report.sync.unchanged,
                report.sync.failed,
                report.sync.failed_pages,
                report.sync.duration,
            );
            for member in &report.pruned {
                println!("pruned: {} from {}", member.item_id, member.index_id);
            }
            for index in &report.prebuilt {
                println!("prebuilt: {} ({})", index.name, index.id);
            }
        }
        Command::Value { index } => {
            app.startup().await?;
            let target = index.map(IndexId::new);
            for (index_id, outcome) in app.value(target.as_ref()).await? {
                match outcome {
                    Ok(point) => println!("{}", serde_json::to_string(&point)?),
                    Err(e) => eprintln!("{index_id}: {e}"),
                }
            }
        }
    }

    Ok(())
}
