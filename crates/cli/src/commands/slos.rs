//! SLO status CLI commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, SloStatusView};
use crate::output::{color_status, format_timestamp, print_info, OutputFormat};

/// Row for the SLO status table
#[derive(Tabled)]
struct SloRow {
    #[tabled(rename = "SLO")]
    slo_id: String,
    #[tabled(rename = "Alert")]
    alert: String,
    #[tabled(rename = "Attainment")]
    attainment: String,
    #[tabled(rename = "Budget Left")]
    budget: String,
    #[tabled(rename = "Exhaustion")]
    exhaustion: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

/// Show current SLO status rows
pub async fn list_slos(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Vec<SloStatusView> = client.get("/v1/slos").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                print_info("No SLOs evaluated yet");
                return Ok(());
            }

            let rows: Vec<SloRow> = result
                .iter()
                .map(|s| SloRow {
                    slo_id: s.slo_id.clone(),
                    alert: color_status(&s.alert_status),
                    attainment: format!("{:.3}%", s.current_attainment),
                    budget: format!("{:.1}%", s.error_budget_remaining_percent),
                    exhaustion: s
                        .projected_exhaustion
                        .map(format_timestamp)
                        .unwrap_or_else(|| "-".to_string()),
                    updated: format_timestamp(s.updated_at),
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
