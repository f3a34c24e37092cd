//! Dashboard configuration
//!
//! The endpoint base is an explicit value handed to the data service at
//! construction. Nothing in the crate reads environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the REST data service, without the `/api` suffix
    pub base_url: String,

    /// Optional API key, sent as a bearer token
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// How long a save confirmation stays visible before the edit closes
    pub confirmation_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: default_timeout(),
            confirmation_ms: default_confirmation(),
        }
    }
}

fn default_timeout() -> u64 { 30 }
fn default_confirmation() -> u64 { 2000 }

impl DashboardConfig {
    /// Config pointing at the given base URL, other fields defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() || !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        Ok(())
    }

    fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Collection endpoint: `<base>/api/<resource>/`
    pub fn endpoint_url(&self, resource: &str) -> String {
        format!("{}/api/{}/", self.base(), resource)
    }

    /// Item endpoint: `<base>/api/<resource>/<id>/`
    pub fn item_url(&self, resource: &str, id: &str) -> String {
        format!(
            "{}/api/{}/{}/",
            self.base(),
            resource,
            urlencoding::encode(id)
        )
    }

    pub fn confirmation(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.confirmation_ms)
    }
}
