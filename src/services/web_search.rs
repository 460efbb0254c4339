//! Web search fallback for questions the knowledge base cannot answer.
//!
//! Talks to a SearxNG-compatible JSON endpoint. The fallback is best-effort:
//! the composer logs and continues when a search fails, so no error here
//! ever aborts an answer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::models::WebSearchConfig;

const SEARCH_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// One web search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, rename = "content")]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

pub struct SearxClient {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl SearxClient {
    pub fn new(endpoint: impl Into<String>, max_results: u32) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            max_results: max_results.max(1) as usize,
        })
    }
}

#[async_trait]
impl WebSearch for SearxClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status()));
        }

        let parsed: SearchResponse = response.json().await?;
        let mut results = parsed.results;
        results.truncate(self.max_results);
        Ok(results)
    }
}

/// Create the web search client when an endpoint is configured.
pub fn create_search(config: &WebSearchConfig) -> Result<Option<Arc<dyn WebSearch>>, SearchError> {
    match config.url {
        Some(ref url) => Ok(Some(Arc::new(SearxClient::new(
            url.clone(),
            config.max_results,
        )?))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_parsing() {
        let json = r#"{
            "results": [
                {"title": "Rust Book", "url": "https://doc.rust-lang.org/book/", "content": "Learn Rust"},
                {"title": "No snippet", "url": "https://example.com"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].snippet, "Learn Rust");
        assert_eq!(parsed.results[1].snippet, "");
    }

    #[test]
    fn unconfigured_search_is_none() {
        let config = WebSearchConfig::default();
        assert!(create_search(&config).unwrap().is_none());
    }
}
