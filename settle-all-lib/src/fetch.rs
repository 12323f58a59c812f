//! HTTP GET + JSON field extraction transform.
//!
//! This is the demonstration workload the benchmark driver feeds through the
//! settle-all core: fetch a URL, parse the body as JSON, and pull one field out.
//! Every failure is returned as a [`SettleError`] so it lands in the
//! corresponding `Rejected` slot.

use crate::error::SettleError;
use crate::utils::validate_url;
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default field extracted from each response
pub const DEFAULT_FIELD: &str = "title";

/// Fetches JSON documents and extracts one field from each.
///
/// Cloning is cheap: the underlying HTTP client is reference counted, so one
/// fetcher can be shared by every worker of a run.
#[derive(Clone, Debug)]
pub struct JsonFieldFetcher {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Timeout for a single request, including body download
    timeout: Duration,
    /// Dotted path of the field to extract
    field: String,
}

impl JsonFieldFetcher {
    /// Create a fetcher with default timeout and field.
    pub fn new() -> Result<Self, SettleError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_FIELD)
    }

    /// Create a fetcher with a custom timeout and field path.
    pub fn with_config<F: Into<String>>(timeout: Duration, field: F) -> Result<Self, SettleError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout.saturating_add(Duration::from_secs(2))) // Add buffer for HTTP timeout
            .build()
            .map_err(|e| {
                SettleError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        Ok(Self {
            http_client,
            timeout,
            field: field.into(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` if the URL is not an absolute http(s) URL
    /// - `Timeout` if the request takes longer than the configured timeout
    /// - `HttpStatus` for non-2xx responses
    /// - `NetworkError` / `ParseError` for transport and body failures
    pub async fn fetch_json(&self, url: &str) -> Result<Value, SettleError> {
        validate_url(url)?;

        match tokio::time::timeout(self.timeout, self.request_json(url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(url, timeout_ms = self.timeout.as_millis() as u64, "request timed out");
                Err(SettleError::timeout(format!("GET {}", url), self.timeout))
            }
        }
    }

    /// GET `url` and extract the configured field from the JSON body.
    pub async fn fetch_field(&self, url: &str) -> Result<Value, SettleError> {
        let json = self.fetch_json(url).await?;
        extract_field(&json, &self.field)
            .cloned()
            .ok_or_else(|| SettleError::missing_field(url, &self.field))
    }

    async fn request_json(&self, url: &str) -> Result<Value, SettleError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            tracing::debug!(url, error = %e, "request failed");
            SettleError::from(e)
        })?;

        let status = response.status();
        tracing::trace!(url, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(SettleError::http_status(url, status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SettleError::ParseError {
            message: format!("Failed to parse JSON from '{}': {}", url, e),
            content: Some(body.chars().take(200).collect()),
        })
    }
}

/// Look up a dotted path in a JSON document.
///
/// Object keys are matched literally; on arrays a segment must be an index.
/// An empty path returns the whole document.
///
/// ```rust
/// use serde_json::json;
/// use settle_all_lib::extract_field;
///
/// let doc = json!({"user": {"tags": ["a", "b"]}});
/// assert_eq!(extract_field(&doc, "user.tags.1"), Some(&json!("b")));
/// assert_eq!(extract_field(&doc, "user.name"), None);
/// ```
pub fn extract_field<'v>(json: &'v Value, path: &str) -> Option<&'v Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(json);
    }

    path.split('.').try_fold(json, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
