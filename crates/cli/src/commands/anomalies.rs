//! Anomaly event CLI commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{AnomalyView, ApiClient};
use crate::output::{color_confidence, color_status, format_timestamp, print_info, OutputFormat};

/// Row for the anomalies table
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Sigma")]
    sigma: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// List recent anomaly events
pub async fn list_anomalies(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let path = format!("/v1/anomalies?limit={}", limit);
    let result: Vec<AnomalyView> = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                print_info("No anomalies detected");
                return Ok(());
            }

            let rows: Vec<AnomalyRow> = result
                .iter()
                .rev()
                .map(|a| AnomalyRow {
                    time: format_timestamp(a.timestamp),
                    service: a.service.clone(),
                    target: a.metric_or_pattern.clone(),
                    method: a.method.clone(),
                    severity: color_status(&a.severity),
                    sigma: format!("{:+.1}", a.deviation_sigma),
                    confidence: color_confidence(a.confidence),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
