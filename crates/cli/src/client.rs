//! API client for communicating with the analytics engine

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the analytics engine
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub components: std::collections::HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateView {
    pub id: String,
    pub service: String,
    pub tokens: Vec<String>,
    pub total_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub severity_counts: SeverityCountsView,
    pub is_error_pattern: bool,
    pub is_rare_pattern: bool,
}

impl TemplateView {
    pub fn template_string(&self) -> String {
        self.tokens.join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityCountsView {
    pub info: u64,
    pub warn: u64,
    pub error: u64,
    pub fatal: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloStatusView {
    pub slo_id: String,
    pub updated_at: i64,
    pub current_attainment: f64,
    pub error_budget_remaining_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_exhaustion: Option<i64>,
    pub alert_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyView {
    pub service: String,
    pub metric_or_pattern: String,
    pub timestamp: i64,
    pub observed: f64,
    pub expected: f64,
    pub deviation_sigma: f64,
    pub score: f64,
    pub confidence: f64,
    pub method: String,
    pub severity: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("http://localhost:8080").is_ok());
    }

    #[tokio::test]
    async fn test_get_parses_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/slos")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"slo_id": "slo-1", "updated_at": 100, "current_attainment": 99.95,
                     "error_budget_remaining_percent": 80.0, "alert_status": "ok"}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let statuses: Vec<SloStatusView> = client.get("/v1/slos").await.unwrap();

        mock.assert_async().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].slo_id, "slo-1");
        assert_eq!(statuses[0].alert_status, "ok");
    }

    #[tokio::test]
    async fn test_get_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/slos")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<Vec<SloStatusView>> = client.get("/v1/slos").await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("500"));
    }
}
