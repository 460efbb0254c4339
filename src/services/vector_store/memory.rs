//! In-process vector store for tests and local development.
//!
//! Knowledge bases are nested maps: kb id → document id → chunks, behind a
//! `tokio::sync::RwLock`, so concurrent replacements of the same document
//! serialize and readers never observe a half-replaced document.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentSummary, VectorStore, similarity};
use crate::error::VectorStoreError;
use crate::models::{DocumentChunk, RetrievedChunk, SimilarityMetric};

#[derive(Debug)]
pub struct MemoryBackend {
    knowledge_bases: RwLock<HashMap<String, HashMap<String, Vec<DocumentChunk>>>>,
    metric: SimilarityMetric,
}

impl MemoryBackend {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            knowledge_bases: RwLock::new(HashMap::new()),
            metric,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(SimilarityMetric::Cosine)
    }
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn replace_document(
        &self,
        kb_id: &str,
        document_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError> {
        let mut kbs = self.knowledge_bases.write().await;
        let kb = kbs.entry(kb_id.to_string()).or_default();
        kb.insert(document_id.to_string(), chunks);
        Ok(())
    }

    async fn search(
        &self,
        kb_id: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError> {
        let kbs = self.knowledge_bases.read().await;
        let Some(kb) = kbs.get(kb_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<RetrievedChunk> = kb
            .values()
            .flatten()
            .map(|chunk| RetrievedChunk {
                chunk_id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                chunk_index: chunk.chunk_index,
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                score: similarity(self.metric, &chunk.embedding, &query_vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit as usize);
        Ok(scored)
    }

    async fn delete_document(
        &self,
        kb_id: &str,
        document_id: &str,
    ) -> Result<(), VectorStoreError> {
        let mut kbs = self.knowledge_bases.write().await;
        if let Some(kb) = kbs.get_mut(kb_id) {
            kb.remove(document_id);
        }
        Ok(())
    }

    async fn count(&self, kb_id: &str) -> Result<u64, VectorStoreError> {
        let kbs = self.knowledge_bases.read().await;
        Ok(kbs
            .get(kb_id)
            .map(|kb| kb.values().map(Vec::len).sum::<usize>() as u64)
            .unwrap_or(0))
    }

    async fn list_documents(&self, kb_id: &str) -> Result<Vec<DocumentSummary>, VectorStoreError> {
        let kbs = self.knowledge_bases.read().await;
        let Some(kb) = kbs.get(kb_id) else {
            return Ok(Vec::new());
        };

        let mut summaries: Vec<DocumentSummary> = kb
            .iter()
            .map(|(document_id, chunks)| DocumentSummary {
                document_id: document_id.clone(),
                source_location: chunks
                    .first()
                    .map(|c| c.source.location.clone())
                    .unwrap_or_default(),
                chunk_count: chunks.len() as u64,
            })
            .collect();

        summaries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(summaries)
    }

    async fn clear(&self, kb_id: &str) -> Result<(), VectorStoreError> {
        let mut kbs = self.knowledge_bases.write().await;
        kbs.remove(kb_id);
        Ok(())
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, Document, DocumentChunk, DocumentMetadata, Source};

    fn doc(location: &str, content: &str) -> Document {
        Document::new(
            content.to_string(),
            ContentType::Text,
            Source::file(location),
            DocumentMetadata::default(),
        )
    }

    fn chunk_with_embedding(document: &Document, index: u32, embedding: Vec<f32>) -> DocumentChunk {
        let mut chunk = DocumentChunk::from_document(
            document,
            format!("chunk {}", index),
            index,
            1,
            0,
            10,
        );
        chunk.embedding = embedding;
        chunk
    }

    #[tokio::test]
    async fn replace_is_idempotent() {
        let store = MemoryBackend::default();
        let document = doc("/a.txt", "first version");

        let v1 = vec![
            chunk_with_embedding(&document, 0, vec![1.0, 0.0]),
            chunk_with_embedding(&document, 1, vec![0.0, 1.0]),
            chunk_with_embedding(&document, 2, vec![1.0, 1.0]),
        ];
        store
            .replace_document("kb", &document.id, v1)
            .await
            .unwrap();
        assert_eq!(store.count("kb").await.unwrap(), 3);

        // Re-ingest with different content: only the new chunk set remains
        let v2 = vec![chunk_with_embedding(&document, 0, vec![0.5, 0.5])];
        store
            .replace_document("kb", &document.id, v2)
            .await
            .unwrap();
        assert_eq!(store.count("kb").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn search_never_crosses_knowledge_bases() {
        let store = MemoryBackend::default();
        let doc_a = doc("/a.txt", "alpha");
        let doc_b = doc("/b.txt", "beta");

        store
            .replace_document("kb_a", &doc_a.id, vec![chunk_with_embedding(&doc_a, 0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .replace_document("kb_b", &doc_b.id, vec![chunk_with_embedding(&doc_b, 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.search("kb_a", vec![1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, doc_a.id);
    }

    #[tokio::test]
    async fn search_sorts_descending_and_caps() {
        let store = MemoryBackend::default();
        let document = doc("/a.txt", "text");

        let chunks = vec![
            chunk_with_embedding(&document, 0, vec![1.0, 0.0]),
            chunk_with_embedding(&document, 1, vec![0.7, 0.7]),
            chunk_with_embedding(&document, 2, vec![0.0, 1.0]),
        ];
        store
            .replace_document("kb", &document.id, chunks)
            .await
            .unwrap();

        let hits = store.search("kb", vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].chunk_index, 0);
    }

    #[tokio::test]
    async fn empty_kb_returns_empty() {
        let store = MemoryBackend::default();
        let hits = store.search("missing", vec![1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_document_is_whole_document() {
        let store = MemoryBackend::default();
        let document = doc("/a.txt", "text");

        store
            .replace_document(
                "kb",
                &document.id,
                vec![
                    chunk_with_embedding(&document, 0, vec![1.0, 0.0]),
                    chunk_with_embedding(&document, 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        store.delete_document("kb", &document.id).await.unwrap();
        assert_eq!(store.count("kb").await.unwrap(), 0);
        assert!(store.list_documents("kb").await.unwrap().is_empty());
    }
}
