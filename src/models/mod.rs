mod config;
mod document;
mod retrieval;
mod session;

pub use config::{
    Config, DATABASE_URL_ENV, DEFAULT_DATABASE_URL, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_TABLE, EmbeddingConfig, EmbeddingStrategy, GenerationConfig,
    IngestionConfig, RetrievalConfig, SessionConfig, SimilarityMetric, VectorDriver,
    VectorStoreConfig, WebSearchConfig,
};
pub use document::{Document, DocumentChunk, DocumentMetadata, ContentType, Source, SourceKind};
pub use retrieval::{OutputFormat, RetrievalResult, RetrievedChunk};
pub use session::{Role, Session, Turn, prompt_window};
