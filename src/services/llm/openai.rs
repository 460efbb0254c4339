//! OpenAI-compatible chat completion backend.
//!
//! Works against api.openai.com or any gateway speaking the same
//! `/chat/completions` protocol when `base_url` is overridden.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ChatBackend, ChatMessage};
use crate::error::GenerationError;
use crate::models::GenerationConfig;
use crate::utils::retry::{RetryConfig, RetryResult, with_retry};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const PROVIDER: &str = "openai";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    retry: RetryConfig,
}

impl OpenAiBackend {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Provider {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let base = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            api_key: std::env::var(API_KEY_ENV).ok(),
            model: config.model.clone(),
            retry: RetryConfig::new(2),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    provider: PROVIDER.to_string(),
                }
            } else {
                GenerationError::Request {
                    provider: PROVIDER.to_string(),
                    source: e,
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                provider: PROVIDER.to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    detail: e.to_string(),
                })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse {
                provider: PROVIDER.to_string(),
                detail: "empty completion".to_string(),
            })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        match with_retry(&self.retry, || self.request(messages)).await {
            RetryResult::Success(answer) => Ok(answer),
            RetryResult::Failed { last_error, .. } => Err(last_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_base_url() {
        let config = GenerationConfig {
            base_url: Some("http://localhost:8000/v1/".to_string()),
            ..Default::default()
        };
        let backend = OpenAiBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn default_endpoint() {
        let backend = OpenAiBackend::new(&GenerationConfig::default()).unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(backend.provider(), "openai");
    }
}
