//! Shipping Quote CLI
//!
//! A command-line tool for requesting quotes, checking service health,
//! and inspecting artifact directories.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{artifacts, health, quote};
use std::path::PathBuf;

/// Shipping Quote CLI
#[derive(Parser)]
#[command(name = "shipq")]
#[command(author, version, about = "CLI for the Shipping Quote service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SHIPQ_API_URL env var)
    #[arg(long, env = "SHIPQ_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request a shipping quote
    Quote {
        /// Number of distinct items in the order
        #[arg(long)]
        num_items: i64,

        /// Destination region code
        #[arg(long)]
        estado: String,

        /// Order subtotal
        #[arg(long)]
        subtotal: Option<f64>,

        /// Order total
        #[arg(long)]
        total: Option<f64>,

        /// Total quantity of units across items
        #[arg(long)]
        total_quantity: Option<i64>,
    },

    /// Show service health
    Health,

    /// Load artifacts from a directory and report which are usable
    Artifacts {
        /// Directory holding the artifact files
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Quote {
            num_items,
            estado,
            subtotal,
            total,
            total_quantity,
        } => {
            let client = api_client(cli.api_url)?;
            let args = quote::QuoteArgs {
                num_items,
                estado,
                subtotal,
                total,
                total_quantity,
            };
            quote::get_quote(&client, &args, cli.format).await?;
        }
        Commands::Health => {
            let client = api_client(cli.api_url)?;
            health::show_health(&client, cli.format).await?;
        }
        Commands::Artifacts { dir } => {
            artifacts::check_artifacts(&dir, cli.format)?;
        }
    }

    Ok(())
}

fn api_client(flag: Option<String>) -> Result<client::ApiClient> {
    let config = config::Config::load()?;
    client::ApiClient::new(&config.api_url(flag))
}
