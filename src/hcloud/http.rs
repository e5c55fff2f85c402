//! HTTP utilities for Hetzner Cloud REST API calls

use crate::error::FetchError;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const USER_AGENT: &str = concat!("hcfleet/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = match body.char_indices().nth(MAX_LOG_BODY_LENGTH) {
        Some((cut, _)) => format!(
            "{}... [truncated, {} bytes total]",
            &body[..cut],
            body.len()
        ),
        None => body.to_string(),
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A response whose status has not been judged yet.
///
/// Reads turn non-2xx replies into errors through [`ApiResponse::into_success`];
/// the snapshot orchestrator inspects the status itself.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Provider-supplied error message (`{"error": {"message": ...}}`)
    pub fn error_message(&self) -> Option<String> {
        self.body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| m.to_string())
    }

    pub fn into_success(self) -> Result<Value, FetchError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FetchError::Status {
                status: self.status.as_u16(),
                message: self.error_message(),
            })
        }
    }
}

/// HTTP client wrapper for Hetzner Cloud API calls
#[derive(Clone)]
pub struct HcloudHttpClient {
    client: Client,
}

impl HcloudHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self { client })
    }

    /// Make a GET request with query parameters
    pub async fn get(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, FetchError> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Self::read_response(response).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, token: &str, body: &Value) -> Result<ApiResponse, FetchError> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<ApiResponse, FetchError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
        }

        // Handle empty response
        if text.trim().is_empty() {
            return Ok(ApiResponse {
                status,
                body: Value::Null,
            });
        }

        match serde_json::from_str(&text) {
            Ok(body) => Ok(ApiResponse { status, body }),
            // Error pages from proxies are not JSON; keep the status so the caller can classify it
            Err(_) if !status.is_success() => Ok(ApiResponse {
                status,
                body: Value::Null,
            }),
            Err(e) => Err(FetchError::Decode(format!(
                "invalid JSON body ({}): {}",
                e,
                sanitize_for_log(&text)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(logged.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_handles_multibyte_boundaries() {
        let body = "€".repeat(300);
        let logged = sanitize_for_log(&body);
        assert!(logged.contains("truncated"));
    }

    #[test]
    fn test_error_message_extraction() {
        let response = ApiResponse {
            status: StatusCode::FORBIDDEN,
            body: json!({"error": {"code": "forbidden", "message": "insufficient permissions"}}),
        };
        assert_eq!(
            response.error_message().as_deref(),
            Some("insufficient permissions")
        );

        let err = response.into_success().unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 403, .. }));
    }
}
