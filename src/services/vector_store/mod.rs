//! Vector store abstraction layer.
//!
//! A trait-based abstraction over vector store backends (Postgres/pgvector,
//! in-memory) allowing switching based on configuration. Every operation is
//! scoped to a knowledge base id; results never cross that boundary.

mod memory;
mod pgvector;

pub use memory::MemoryBackend;
pub use pgvector::PgVectorBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, RetrievedChunk, SimilarityMetric, VectorDriver, VectorStoreConfig};

/// Per-document summary inside a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub source_location: String,
    pub chunk_count: u64,
}

/// Abstract trait for vector store operations.
///
/// Mutation is transactional at document granularity: `replace_document`
/// atomically removes any prior chunks for the document id and inserts the
/// new set, so a failure leaves the previous version intact and re-ingestion
/// is idempotent.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the store is healthy and reachable.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Atomically replace all chunks of a document within a knowledge base.
    async fn replace_document(
        &self,
        kb_id: &str,
        document_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError>;

    /// Nearest-neighbor search within a single knowledge base.
    ///
    /// Returns up to `limit` chunks ordered by descending similarity.
    async fn search(
        &self,
        kb_id: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError>;

    /// Delete every chunk of a document (whole-document granularity only).
    async fn delete_document(
        &self,
        kb_id: &str,
        document_id: &str,
    ) -> Result<(), VectorStoreError>;

    /// Number of chunks in a knowledge base.
    async fn count(&self, kb_id: &str) -> Result<u64, VectorStoreError>;

    /// Documents present in a knowledge base.
    async fn list_documents(&self, kb_id: &str) -> Result<Vec<DocumentSummary>, VectorStoreError>;

    /// Remove a knowledge base entirely.
    async fn clear(&self, kb_id: &str) -> Result<(), VectorStoreError>;

    /// The similarity metric this store was created with.
    fn metric(&self) -> SimilarityMetric;
}

/// Create a vector store backend based on configuration.
pub async fn create_backend(
    config: &VectorStoreConfig,
    embedding_dim: u32,
) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Pgvector => {
            let backend = PgVectorBackend::new(config, embedding_dim).await?;
            Ok(Arc::new(backend))
        }
        VectorDriver::Memory => Ok(Arc::new(MemoryBackend::new(config.metric))),
    }
}

/// Score two vectors under the given metric.
///
/// Cosine scores match pgvector's `1 - (a <=> b)`; inner-product scores are
/// raw dot products. Scores from different metrics are never comparable.
pub(crate) fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    match metric {
        SimilarityMetric::Dot => dot,
        SimilarityMetric::Cosine => {
            let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                return 0.0;
            }
            dot / (norm_a * norm_b)
        }
    }
}
