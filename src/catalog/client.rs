//! HTTP client for the upstream catalog API.

use std::time::Duration;

use crate::error::{AppError, AppResult};

use super::types::Document;

/// Fetches the catalog/orders document from the configured upstream.
///
/// One client is built at startup and shared; the URL and API key come in
/// per call because they are hot-reloadable settings.
pub struct CatalogClient {
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self { http })
    }

    /// Fetch and decode the full document. No retry here; retrying is the
    /// scheduler's concern.
    pub async fn fetch(&self, base_url: &str, api_key: &str) -> AppResult<Document> {
        if base_url.is_empty() {
            return Err(AppError::Validation(
                "upstream api_base_url is not configured".into(),
            ));
        }

        let response = self
            .http
            .get(base_url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "upstream returned {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        serde_json::from_slice::<Document>(&body)
            .map_err(|e| AppError::UpstreamMalformed(e.to_string()))
    }
}
