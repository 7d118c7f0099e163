//! RxLedger CLI - Main entry point

use clap::{Parser, Subcommand};
use rxledger_rpc::{commands, AppConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rxledger")]
#[command(about = "RxLedger - Prescription decision pipeline", long_about = None)]
struct Cli {
    /// Config file path (JSON); falls back to $RXLEDGER_CONFIG, then defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample prescriptions through the pipeline
    Demo,

    /// Submit prescriptions from a JSON array file
    Submit {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Keep the escalation worker running after submitting
        #[arg(long)]
        sweep: bool,
    },

    /// Print the effective configuration
    Config,

    /// Build the sample chain and verify it
    Audit {
        /// Export the verified chain as JSON lines
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    match cli.command {
        Commands::Config => commands::config(&config)?,

        Commands::Demo => {
            let ctx = Arc::new(commands::build_context(config)?);
            commands::demo(ctx).await?;
        }

        Commands::Submit { file, sweep } => {
            let ctx = Arc::new(commands::build_context(config)?);
            commands::submit_file(ctx, &file, sweep).await?;
        }

        Commands::Audit { export } => {
            let ctx = Arc::new(commands::build_context(config)?);
            commands::audit(ctx, export.as_deref()).await?;
        }
    }

    Ok(())
}
