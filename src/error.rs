//! Error types for the knowledge-base chat engine.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding backend: {0}")]
    ConnectionError(String),

    #[error("embedding backend error: {0}")]
    BackendError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding model error: {0}")]
    ModelError(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("embedding backend unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::BackendError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("loading")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            // Wrong dimensions or malformed payloads will not fix themselves
            EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::InvalidResponse(_)
            | EmbeddingError::ModelError(_)
            | EmbeddingError::Unavailable { .. } => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store unreachable: {0}")]
    ConnectionError(String),

    #[error("table error: {0}")]
    TableError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("pgvector extension missing: {0}")]
    ExtensionError(String),

    #[error("unknown knowledge base: {0}")]
    UnknownKnowledgeBase(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::TableError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::SearchError(msg)
            | VectorStoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
            VectorStoreError::ExtensionError(_) | VectorStoreError::UnknownKnowledgeBase(_) => {
                false
            }
        }
    }
}

/// Errors related to document ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported format for '{src}': {detail}")]
    UnsupportedFormat { src: String, detail: String },

    #[error("failed to fetch '{src}': {detail}")]
    Fetch { src: String, detail: String },

    #[error("document '{0}' produced no text content")]
    EmptyContent(String),

    #[error("file read error: {0}")]
    FileReadError(String),

    #[error("extraction error for '{src}': {detail}")]
    Extraction { src: String, detail: String },

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("no ingestable sources found")]
    NoSources,
}

impl IngestError {
    /// Permanent failures fail a single batch item without aborting the batch.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedFormat { .. }
                | IngestError::EmptyContent(_)
                | IngestError::Extraction { .. }
                | IngestError::FileReadError(_)
        )
    }
}

/// Errors related to answer generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    #[error("provider '{provider}' request failed: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider '{provider}' returned a malformed response: {detail}")]
    InvalidResponse { provider: String, detail: String },

    #[error("provider '{provider}' timed out")]
    Timeout { provider: String },
}

impl GenerationError {
    pub fn provider(&self) -> &str {
        match self {
            GenerationError::Provider { provider, .. }
            | GenerationError::Request { provider, .. }
            | GenerationError::InvalidResponse { provider, .. }
            | GenerationError::Timeout { provider } => provider,
        }
    }
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout { .. } => true,
            GenerationError::Provider { message, .. } => {
                message.contains("429")
                    || message.contains("503")
                    || message.to_lowercase().contains("overloaded")
                    || message.to_lowercase().contains("rate limit")
            }
            GenerationError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            GenerationError::InvalidResponse { .. } => false,
        }
    }
}

/// Errors related to session persistence.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("session database path error: {0}")]
    Path(String),

    #[error("session store lock poisoned")]
    LockPoisoned,

    #[error("unknown session: {0}")]
    UnknownSession(String),
}

/// Errors related to retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors related to answer composition (retrieval + generation + session).
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("retrieval error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("retrieval error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_retryability() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::ConnectionError("refused".into()).is_retryable());
        assert!(EmbeddingError::BackendError("status 503: busy".into()).is_retryable());
        assert!(!EmbeddingError::InvalidResponse("garbage".into()).is_retryable());
        assert!(
            !EmbeddingError::DimensionMismatch {
                expected: 1024,
                actual: 768
            }
            .is_retryable()
        );
    }

    #[test]
    fn generation_error_keeps_provider() {
        let err = GenerationError::Provider {
            provider: "openai".into(),
            message: "quota exceeded".into(),
        };
        assert_eq!(err.provider(), "openai");
        assert!(err.to_string().contains("openai"));
    }

    #[test]
    fn permanent_ingest_errors() {
        let err = IngestError::UnsupportedFormat {
            src: "a.bin".into(),
            detail: "binary file".into(),
        };
        assert!(err.is_permanent());
        assert!(IngestError::EmptyContent("doc".into()).is_permanent());
        assert!(!IngestError::EmbeddingError(EmbeddingError::Timeout).is_permanent());
    }
}
