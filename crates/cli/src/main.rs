//! Promptgate CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway server
//! - `seed`  — Populate the handbook vector collections with sample data

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "promptgate",
    about = "Promptgate — guardrail-aware LLM gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the server config file (default: ./promptgate.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Recreate and seed the handbook vector collections
    Seed {
        /// Qdrant instance URL
        #[arg(long, default_value = "http://localhost:6333")]
        qdrant_url: String,

        /// Qdrant API key (optional, for hosted clusters)
        #[arg(long)]
        qdrant_api_key: Option<String>,

        /// OpenAI API key for embeddings (falls back to OPENAI_API_KEY)
        #[arg(long)]
        openai_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, config } => commands::serve::run(port, config).await?,
        Commands::Seed { qdrant_url, qdrant_api_key, openai_key } => {
            commands::seed::run(&qdrant_url, qdrant_api_key.as_deref(), openai_key).await?
        }
    }

    Ok(())
}
