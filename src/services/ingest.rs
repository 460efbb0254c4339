//! Ingestion pipeline: fetch, extract, chunk, embed, store.
//!
//! A document is replaced atomically in the vector store, so re-ingesting a
//! source that already exists supersedes it instead of duplicating it. Batch
//! ingestion processes sources concurrently; a permanently broken source
//! fails on its own while infrastructure failures abort the whole batch.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::extract::Extractor;
use crate::models::{ContentType, IngestionConfig, Source};
use crate::services::chunker::TextChunker;
use crate::services::embedding::Embedder;
use crate::services::vector_store::VectorStore;

/// Outcome of one successfully ingested source.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub document_id: String,
    pub source: Source,
    pub chunk_count: usize,
}

/// A source that failed permanently during batch ingestion.
#[derive(Debug)]
pub struct IngestFailure {
    pub source: Source,
    pub error: IngestError,
}

/// Per-batch report: which sources landed, which did not.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub succeeded: Vec<IngestedDocument>,
    pub failed: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn total_chunks(&self) -> usize {
        self.succeeded.iter().map(|d| d.chunk_count).sum()
    }
}

pub struct IngestionPipeline {
    extractor: Extractor,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        config: &IngestionConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            extractor: Extractor::new(config)?,
            chunker: TextChunker::new(config),
            embedder,
            store,
            concurrency: config.concurrency.max(1) as usize,
        })
    }

    /// Ingest a single source into a knowledge base.
    pub async fn ingest_source(
        &self,
        kb_id: &str,
        source: &Source,
    ) -> Result<IngestedDocument, IngestError> {
        let document = self.extractor.extract(source).await?;
        let mut chunks = self.chunker.chunk(&document);

        if chunks.is_empty() {
            return Err(IngestError::EmptyContent(source.location.clone()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let chunk_count = chunks.len();
        self.store
            .replace_document(kb_id, &document.id, chunks)
            .await?;

        info!(kb = kb_id, source = %source, chunks = chunk_count, "ingested document");

        Ok(IngestedDocument {
            document_id: document.id,
            source: source.clone(),
            chunk_count,
        })
    }

    /// Ingest a batch of sources with bounded concurrency.
    ///
    /// Permanent per-source failures (unsupported format, empty content,
    /// extraction errors) land in the report without stopping the rest.
    /// Transient infrastructure failures abort immediately so a dead
    /// embedding backend does not burn through the whole batch.
    pub async fn ingest_batch(
        &self,
        kb_id: &str,
        sources: &[Source],
    ) -> Result<IngestReport, IngestError> {
        if sources.is_empty() {
            return Err(IngestError::NoSources);
        }

        let mut report = IngestReport::default();
        let mut stream = futures::stream::iter(sources)
            .map(|source| async move { (source, self.ingest_source(kb_id, source).await) })
            .buffer_unordered(self.concurrency);

        while let Some((source, result)) = stream.next().await {
            match result {
                Ok(ingested) => report.succeeded.push(ingested),
                Err(error) if error.is_permanent() => {
                    warn!(source = %source, %error, "skipping source");
                    report.failed.push(IngestFailure {
                        source: source.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(report)
    }
}

/// Expand user-supplied source arguments into concrete sources.
///
/// URLs pass through; files pass through; directories are walked recursively
/// and every file with an ingestable extension becomes a source.
pub fn expand_sources(inputs: &[String]) -> Result<Vec<Source>, IngestError> {
    let mut sources = Vec::new();

    for input in inputs {
        if input.starts_with("http://") || input.starts_with("https://") {
            sources.push(Source::url(input.clone()));
            continue;
        }

        let path = Path::new(input);
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let ingestable = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(ContentType::from_extension)
                    .is_some();
                if ingestable {
                    sources.push(Source::file(entry.path().to_string_lossy()));
                }
            }
        } else if path.is_file() {
            sources.push(Source::file(input.clone()));
        } else {
            return Err(IngestError::FileReadError(format!(
                "no such file or directory: {}",
                input
            )));
        }
    }

    if sources.is_empty() {
        return Err(IngestError::NoSources);
    }

    Ok(sources)
}
