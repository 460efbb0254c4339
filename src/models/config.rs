use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-large-en-v1.5";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;
pub const DEFAULT_DATABASE_URL: &str = "postgres://ai:ai@localhost:5532/ai";
pub const DEFAULT_TABLE: &str = "kb_chunks";

/// Environment variable consulted for the vector database connection string.
pub const DATABASE_URL_ENV: &str = "KBCHAT_DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub web_search: WebSearchConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("kbchat").join("config.toml"))
    }

    /// Load the config file if present, otherwise defaults. Environment
    /// variables override connection strings and credentials afterwards.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.vector_store.url = url;
        }
        if let Ok(url) = std::env::var("KBCHAT_EMBEDDING_URL") {
            self.embedding.url = Some(url);
        }
        if let Ok(url) = std::env::var("KBCHAT_LLM_BASE_URL") {
            self.generation.base_url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingestion.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(ConfigError::ValidationError(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(ConfigError::ValidationError(
                "min_score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Embedding strategy: remote inference API or local ONNX model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStrategy {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub strategy: EmbeddingStrategy,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Fixed embedding dimension. Constant for the life of a vector store;
    /// a backend returning anything else is a hard error.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    /// Remote inference endpoint. Defaults to the Hugging Face Inference API
    /// URL derived from `model` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Directory holding `model.onnx` + `tokenizer.json` for local inference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    16
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            strategy: EmbeddingStrategy::Remote,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            url: None,
            model_dir: None,
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Vector store backend driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// PostgreSQL with the pgvector extension
    #[default]
    Pgvector,
    /// In-process store for tests and local development
    Memory,
}

/// Similarity metric. Fixed at table creation; scores from different metrics
/// are not comparable, so an existing knowledge base keeps its metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Dot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub metric: SimilarityMetric,

    #[serde(default = "default_pool_max")]
    pub pool_max: u32,

    #[serde(default = "default_pool_acquire_timeout")]
    pub pool_acquire_timeout: u32,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_pool_max() -> u32 {
    5
}

fn default_pool_acquire_timeout() -> u32 {
    10
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::Pgvector,
            url: default_database_url(),
            table: default_table(),
            metric: SimilarityMetric::Cosine,
            pool_max: default_pool_max(),
            pool_acquire_timeout: default_pool_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// How many documents to process concurrently during batch ingestion.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    100
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_concurrency() -> u32 {
    4
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Results below this similarity are dropped entirely; an all-empty
    /// result triggers the composer's web-search fallback.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_top_k() -> u32 {
    5
}

fn default_min_score() -> f32 {
    0.35
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider name: "openai" (or any OpenAI-compatible endpoint) or "ollama".
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Override the provider's default endpoint (e.g. a compatible gateway).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generation_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            base_url: None,
            timeout_secs: default_generation_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// SQLite database path. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Estimated-token budget for the history window handed to the composer.
    #[serde(default = "default_token_budget")]
    pub token_budget: u32,

    /// Sessions idle longer than this are archived, not deleted.
    #[serde(default = "default_archive_after_secs")]
    pub archive_after_secs: u64,
}

fn default_max_turns() -> u32 {
    16
}

fn default_token_budget() -> u32 {
    3000
}

fn default_archive_after_secs() -> u64 {
    7 * 24 * 3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_turns: default_max_turns(),
            token_budget: default_token_budget(),
            archive_after_secs: default_archive_after_secs(),
        }
    }
}

impl SessionConfig {
    pub fn resolved_db_path(&self) -> Result<std::path::PathBuf, ConfigError> {
        if let Some(ref p) = self.db_path {
            return Ok(std::path::PathBuf::from(p));
        }
        dirs::data_dir()
            .map(|p| p.join("kbchat").join("sessions.db"))
            .ok_or_else(|| {
                ConfigError::PathError("could not determine data directory".to_string())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebSearchConfig {
    /// SearxNG-compatible JSON search endpoint. Fallback is disabled when
    /// unset; the composer then states that no relevant knowledge was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_search_results")]
    pub max_results: u32,
}

fn default_search_results() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.embedding.dimension, 1024);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.vector_store.driver, VectorDriver::Pgvector);
        assert_eq!(config.vector_store.metric, SimilarityMetric::Cosine);
        assert_eq!(config.ingestion.chunk_size, 1000);
        assert_eq!(config.ingestion.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.min_score - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn validation_rejects_bad_overlap() {
        let mut config = Config::default();
        config.ingestion.chunk_size = 100;
        config.ingestion.chunk_overlap = 100;
        assert!(config.validate().is_err());

        config.ingestion.chunk_overlap = 99;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_min_score() {
        let mut config = Config::default();
        config.retrieval.min_score = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_with_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.embedding.dimension, 1024);

        let parsed: Config = toml::from_str(
            r#"
            [ingestion]
            chunk_size = 500
            chunk_overlap = 50

            [generation]
            provider = "ollama"
            model = "llama3.1"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.ingestion.chunk_size, 500);
        assert_eq!(parsed.generation.provider, "ollama");
        // Untouched sections keep their defaults
        assert_eq!(parsed.retrieval.top_k, 5);
    }
}
