//! HTTP data service over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::traits::DataService;
use crate::config::DashboardConfig;
use crate::error::{ServiceError, ServiceResult};

/// REST data service client.
///
/// # Example
///
/// ```rust,no_run
/// use octofit_dashboard::{DashboardConfig, DataService, HttpDataService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = HttpDataService::new(DashboardConfig::with_base_url("http://localhost:8000"))?;
/// let users = service.list("users").await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpDataService {
    config: DashboardConfig,
    client: Client,
}

impl HttpDataService {
    /// Build a client for `config`. Fails if the base URL is not http(s).
    pub fn new(config: DashboardConfig) -> ServiceResult<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ServiceError::Unavailable(format!("invalid API key: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    async fn handle_response(&self, response: reqwest::Response) -> ServiceResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn list(&self, resource: &str) -> ServiceResult<Value> {
        let url = self.config.endpoint_url(resource);
        debug!(%url, "GET collection");

        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    async fn create(&self, resource: &str, body: Value) -> ServiceResult<Value> {
        let url = self.config.endpoint_url(resource);
        debug!(%url, "POST record");

        let response = self.client.post(&url).json(&body).send().await?;
        self.handle_response(response).await
    }

    async fn update(&self, resource: &str, id: &str, body: Value) -> ServiceResult<Value> {
        let url = self.config.item_url(resource, id);
        debug!(%url, "PUT record");

        let response = self.client.put(&url).json(&body).send().await?;
        self.handle_response(response).await
    }
}
