//! HTTP Catalog Client
//!
//! Talks to the remote catalog service over its JSON batch API with
//! `reqwest`. `connect` pings the server once per sync run; `push_updates`
//! posts one chunk and decodes the per-item accounting.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogBatchOutcome, CatalogClient, CatalogPayload};
use bridge_traits::error::{BridgeError, Result};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog client over HTTP.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCatalogClient {
    /// Create a client for the catalog at `base_url`, optionally
    /// authenticating with a bearer `token`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Catalog(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn connect(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, "/ping")
            .send()
            .await
            .map_err(|e| BridgeError::CatalogUnreachable(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| BridgeError::CatalogUnreachable(e.to_string()))?;
        debug!(base_url = %self.base_url, "catalog reachable");
        Ok(())
    }

    async fn push_updates(&self, items: &[CatalogPayload]) -> Result<CatalogBatchOutcome> {
        let response = self
            .request(reqwest::Method::POST, "/api/items/batch/update")
            .json(items)
            .send()
            .await
            .map_err(|e| BridgeError::Catalog(e.to_string()))?
            .error_for_status()
            .map_err(|e| BridgeError::Catalog(e.to_string()))?;

        response
            .json::<CatalogBatchOutcome>()
            .await
            .map_err(|e| BridgeError::Catalog(format!("malformed batch response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = HttpCatalogClient::new("https://shelf.local/", None).unwrap();
        assert_eq!(client.base_url, "https://shelf.local");
    }
}
