//! Remote embedding strategy against a Hugging Face-style inference API.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use async_trait::async_trait;

use super::{Embedder, QUERY_INSTRUCTION, check_dimensions};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryConfig, RetryResult, Retryable, with_retry};

const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

/// Environment variable holding the inference API token.
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

/// Embedding client backed by a remote inference endpoint.
///
/// Transient failures (timeouts, 429/5xx, model still loading) are retried
/// with bounded exponential backoff; exhaustion surfaces
/// [`EmbeddingError::Unavailable`] and aborts the enclosing operation.
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    batch_size: usize,
    retry: RetryConfig,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        let endpoint = config
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", HF_INFERENCE_BASE, config.model))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            endpoint,
            api_key: std::env::var(API_KEY_ENV).ok(),
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
            retry: RetryConfig::new(config.max_attempts),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let result = with_retry(&self.retry, || self.request_batch(batch)).await;
            let embeddings = match result {
                RetryResult::Success(embeddings) => embeddings,
                RetryResult::Failed {
                    last_error,
                    attempts,
                } => {
                    // Permanent errors keep their own shape; only a transient
                    // failure that outlived the budget becomes Unavailable.
                    if !last_error.is_retryable() {
                        return Err(last_error);
                    }
                    return Err(EmbeddingError::Unavailable {
                        attempts,
                        last_error: last_error.to_string(),
                    });
                }
            };
            all_embeddings.extend(embeddings);
        }

        check_dimensions(&all_embeddings, self.dimension)?;
        if all_embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "requested {} embeddings, got {}",
                texts.len(),
                all_embeddings.len()
            )));
        }

        Ok(all_embeddings)
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbedRequest { inputs: texts });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else if e.is_connect() {
                EmbeddingError::ConnectionError(e.to_string())
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::BackendError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_texts(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let prefixed = format!("{}{}", QUERY_INSTRUCTION, text);
        let embeddings = self.embed_texts(std::slice::from_ref(&prefixed)).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_derived_from_model() {
        let config = EmbeddingConfig::default();
        let embedder = RemoteEmbedder::new(&config).unwrap();
        assert_eq!(
            embedder.endpoint(),
            "https://api-inference.huggingface.co/models/BAAI/bge-large-en-v1.5"
        );
        assert_eq!(embedder.dimension(), 1024);
    }

    #[test]
    fn explicit_endpoint_is_trimmed() {
        let config = EmbeddingConfig {
            url: Some("http://localhost:8080/embed/".to_string()),
            ..Default::default()
        };
        let embedder = RemoteEmbedder::new(&config).unwrap();
        assert_eq!(embedder.endpoint(), "http://localhost:8080/embed");
    }
}
