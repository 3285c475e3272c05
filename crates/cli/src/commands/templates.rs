//! Log template CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, TemplateView};
use crate::output::{format_timestamp, print_info, OutputFormat};

/// Row for the templates table
#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Template")]
    template: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Errors")]
    errors: u64,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

/// List mined log templates, most frequent first
pub async fn list_templates(
    client: &ApiClient,
    service: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let path = match service {
        Some(service) => format!("/v1/templates?service={}", service),
        None => "/v1/templates".to_string(),
    };
    let result: Vec<TemplateView> = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                print_info("No templates mined yet");
                return Ok(());
            }

            let rows: Vec<TemplateRow> = result
                .iter()
                .map(|t| TemplateRow {
                    service: t.service.clone(),
                    template: truncate(&t.template_string(), 60),
                    count: t.total_count,
                    errors: t.severity_counts.error + t.severity_counts.fatal,
                    last_seen: format_timestamp(t.last_seen),
                    flags: flags(t),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} templates", result.len());
        }
    }

    Ok(())
}

fn flags(template: &TemplateView) -> String {
    let mut flags = Vec::new();
    if template.is_error_pattern {
        flags.push("error".red().to_string());
    }
    if template.is_rare_pattern {
        flags.push("rare".yellow().to_string());
    }
    flags.join(",")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 1).collect();
        format!("{}…", truncated)
    }
}
