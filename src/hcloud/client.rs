//! Hetzner Cloud client
//!
//! Binds the HTTP wrapper to an API endpoint and a bearer token. Token
//! discovery lives in [`crate::config`]; the client only carries it.

use super::http::{ApiResponse, HcloudHttpClient};
use crate::error::{Error, FetchError, Result};
use serde_json::Value;
use url::Url;

/// Public API endpoint
pub const DEFAULT_API_URL: &str = "https://api.hetzner.cloud/v1";

/// Authenticated Hetzner Cloud client
#[derive(Clone)]
pub struct HcloudClient {
    http: HcloudHttpClient,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HcloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HcloudClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HcloudClient {
    /// Create a new client against `base_url`
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Configuration("API token is empty".to_string()));
        }

        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("invalid API URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "invalid API URL '{base_url}': unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let http = HcloudHttpClient::new()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an API URL from a path relative to the endpoint
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET returning the raw response
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> std::result::Result<ApiResponse, FetchError> {
        self.http.get(&self.url(path), &self.token, query).await
    }

    /// GET that treats any non-2xx reply as an error
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> std::result::Result<Value, FetchError> {
        self.get(path, query).await?.into_success()
    }

    /// POST returning the raw response for the caller to classify
    pub async fn post(&self, path: &str, body: &Value) -> std::result::Result<ApiResponse, FetchError> {
        self.http.post(&self.url(path), &self.token, body).await
    }

    // =========================================================================
    // Endpoint helpers
    // =========================================================================

    pub fn create_image_path(server_id: u64) -> String {
        format!("servers/{server_id}/actions/create_image")
    }

    pub fn action_path(action_id: u64) -> String {
        format!("actions/{action_id}")
    }
}
