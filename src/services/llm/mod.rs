//! Chat completion backends for answer generation.
//!
//! Two providers behind one trait: any OpenAI-compatible endpoint and a
//! local Ollama server. Requests get one bounded retry round for transient
//! failures; the provider name travels with every error.

mod ollama;
mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerationError;
use crate::models::{GenerationConfig, Role};

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generates an answer from an ordered message list.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logs and error messages.
    fn provider(&self) -> &str;

    /// Model identifier used for completions.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;
}

impl std::fmt::Debug for dyn ChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBackend")
            .field("provider", &self.provider())
            .field("model", &self.model())
            .finish()
    }
}

/// Create a chat backend based on configuration.
pub fn create_backend(config: &GenerationConfig) -> Result<Arc<dyn ChatBackend>, GenerationError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiBackend::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaBackend::new(config)?)),
        other => Err(GenerationError::Provider {
            provider: other.to_string(),
            message: "unknown provider (expected 'openai' or 'ollama')".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let config = GenerationConfig {
            provider: "palm".to_string(),
            ..Default::default()
        };
        let err = create_backend(&config).unwrap_err();
        assert_eq!(err.provider(), "palm");
    }

    #[test]
    fn message_roles_serialize_lowercase() {
        let msg = ChatMessage::system("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }
}
