//! Web-search client.
//!
//! Wraps a Bing-style search endpoint behind the `SearchProvider`
//! trait. The raw provider response is returned as JSON; result
//! extraction happens in the pipeline so a fake provider in tests can
//! feed canned responses.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Value, AppError>;
}

pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    subscription_key: String,
}

impl SearchClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("build http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}v7.0/search", config.search_endpoint),
            subscription_key: config.search_key.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, query: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .query(&[("q", query), ("mkt", "en-US")])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "search returned HTTP {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("decode search response: {}", e)))
    }
}
