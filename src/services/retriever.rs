//! Query-side retrieval: embed the question, search one knowledge base.

use std::sync::Arc;

use tracing::debug;

use crate::error::RetrieveError;
use crate::models::{RetrievalConfig, RetrievalResult};
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        config: &RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: config.top_k.max(1) as usize,
            min_score: config.min_score,
        }
    }

    /// Retrieve the top chunks for a query within one knowledge base.
    ///
    /// An empty result set is a valid outcome, not an error; it means no
    /// stored chunk cleared the similarity threshold.
    pub async fn retrieve(
        &self,
        kb_id: &str,
        query: &str,
    ) -> Result<RetrievalResult, RetrieveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrieveError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let hits = self
            .store
            .search(kb_id, query_vector, self.top_k as u64)
            .await?;

        let result = RetrievalResult::from_hits(query, hits, self.top_k, self.min_score);
        debug!(
            kb = kb_id,
            hits = result.len(),
            top_score = result.hits.first().map(|h| h.score),
            "retrieval complete"
        );

        Ok(result)
    }
}
