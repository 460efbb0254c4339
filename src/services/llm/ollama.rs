//! Ollama chat backend for fully local generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ChatBackend, ChatMessage};
use crate::error::GenerationError;
use crate::models::GenerationConfig;
use crate::utils::retry::{RetryConfig, RetryResult, with_retry};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const PROVIDER: &str = "ollama";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
    retry: RetryConfig,
}

impl OllamaBackend {
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
        let endpoint = format!("{}/api/chat", base.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
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
            "stream": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
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

        let chat: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    detail: e.to_string(),
                })?;

        if chat.message.content.trim().is_empty() {
            return Err(GenerationError::InvalidResponse {
                provider: PROVIDER.to_string(),
                detail: "empty completion".to_string(),
            });
        }

        Ok(chat.message.content)
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
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
