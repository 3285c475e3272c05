//! Telemetry Analytics Engine CLI
//!
//! A command-line tool for inspecting a running analytics engine:
//! health, mined log templates, SLO status, and recent anomalies.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{anomalies, health, slos, templates};

/// Telemetry Analytics Engine CLI
#[derive(Parser)]
#[command(name = "tae")]
#[command(author, version, about = "CLI for the Telemetry Analytics Engine", long_about = None)]
pub struct Cli {
    /// Engine API URL (can also be set via TAE_API_URL env var)
    #[arg(long, env = "TAE_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show engine health and component status
    Health,

    /// List mined log templates
    Templates {
        /// Filter templates by service
        #[arg(long)]
        service: Option<String>,
    },

    /// Show current SLO status
    Slos,

    /// List recent anomaly events
    Anomalies {
        /// Maximum number of events to fetch
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    let result = match &cli.command {
        Commands::Health => health::show_health(&client, cli.format).await,
        Commands::Templates { service } => {
            templates::list_templates(&client, service.as_deref(), cli.format).await
        }
        Commands::Slos => slos::list_slos(&client, cli.format).await,
        Commands::Anomalies { limit } => {
            anomalies::list_anomalies(&client, *limit, cli.format).await
        }
    };

    if let Err(e) = &result {
        output::print_error(&format!("{:#}", e));
    }
    result
}
