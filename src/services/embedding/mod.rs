//! Embedding abstraction layer.
//!
//! Two interchangeable strategies behind one trait, selected by
//! configuration: a remote inference API (network-bound, retried with
//! backoff) and a local ONNX model (no network dependency, slower startup).
//! Vectors from different strategies are never comparable; a knowledge base
//! is embedded with exactly one of them.

mod local;
mod remote;

pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, EmbeddingStrategy};

/// BGE-family models retrieve noticeably better when the query side carries
/// this instruction prefix. Document embeddings are computed without it.
pub const QUERY_INSTRUCTION: &str =
    "Represent this sentence for searching relevant passages: ";

/// Turns text into fixed-dimension vectors.
///
/// The dimension is constant for the lifetime of the process; every
/// implementation validates its output against the configured dimension and
/// fails hard on a mismatch rather than returning defective vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed output dimension.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model, for logs and error messages.
    fn model_id(&self) -> &str;

    /// Embed a batch of document texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single search query (instruction-prefixed for BGE models).
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Create an embedder based on configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.strategy {
        EmbeddingStrategy::Remote => Ok(Arc::new(RemoteEmbedder::new(config)?)),
        EmbeddingStrategy::Local => Ok(Arc::new(LocalEmbedder::load(config)?)),
    }
}

/// Validate a batch of vectors against the expected dimension.
pub(crate) fn check_dimensions(
    vectors: &[Vec<f32>],
    expected: usize,
) -> Result<(), EmbeddingError> {
    for vector in vectors {
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_check() {
        let good = vec![vec![0.0; 4], vec![1.0; 4]];
        assert!(check_dimensions(&good, 4).is_ok());

        let bad = vec![vec![0.0; 4], vec![1.0; 3]];
        let err = check_dimensions(&bad, 4).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }
}
