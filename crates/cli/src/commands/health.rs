//! Engine health CLI command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse};
use crate::output::{color_status, format_timestamp, OutputFormat};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show engine health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: HealthResponse = client.get("/healthz").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Engine Health".bold());
            println!("{}", "=".repeat(60));
            println!("Overall: {}", color_status(&result.status));
            println!();

            let mut rows: Vec<ComponentRow> = result
                .components
                .iter()
                .map(|(name, health)| ComponentRow {
                    component: name.clone(),
                    status: color_status(&health.status),
                    last_check: format_timestamp(health.last_check_timestamp),
                    message: health.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.component.cmp(&b.component));

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
