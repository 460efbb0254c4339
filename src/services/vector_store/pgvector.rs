use async_trait::async_trait;
use pgvector::Vector;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use std::time::Duration;

use super::{DocumentSummary, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{
    DocumentChunk, RetrievedChunk, SimilarityMetric, Source, SourceKind, VectorStoreConfig,
};

pub struct PgVectorBackend {
    pool: PgPool,
    table: String,
    metric: SimilarityMetric,
    embedding_dim: u32,
}

impl PgVectorBackend {
    pub async fn new(
        config: &VectorStoreConfig,
        embedding_dim: u32,
    ) -> Result<Self, VectorStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(config.pool_acquire_timeout.into()))
            .connect(&config.url)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        let backend = Self {
            pool,
            table: config.table.clone(),
            metric: config.metric,
            embedding_dim,
        };

        backend.check_pgvector_extension().await?;
        backend.ensure_table().await?;

        Ok(backend)
    }

    async fn check_pgvector_extension(&self) -> Result<(), VectorStoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::TableError(e.to_string()))?;

        if result.is_none() {
            return Err(VectorStoreError::ExtensionError(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        Ok(())
    }

    async fn ensure_table(&self) -> Result<(), VectorStoreError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                kb_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding vector({}) NOT NULL,
                source_kind TEXT NOT NULL,
                source_location TEXT NOT NULL,
                checksum TEXT NOT NULL,
                created_at TEXT NOT NULL,
                start_offset BIGINT NOT NULL,
                end_offset BIGINT NOT NULL
            )
            "#,
            self.table, self.embedding_dim
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::TableError(e.to_string()))?;

        // The metric is fixed at creation time through the index opclass
        let opclass = match self.metric {
            SimilarityMetric::Cosine => "vector_cosine_ops",
            SimilarityMetric::Dot => "vector_ip_ops",
        };

        let indices = [
            format!(
                "CREATE INDEX IF NOT EXISTS {t}_embedding_idx ON {t} USING hnsw (embedding {op})",
                t = self.table,
                op = opclass
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {t}_kb_doc_idx ON {t} (kb_id, document_id)",
                t = self.table
            ),
        ];

        for index_sql in &indices {
            sqlx::query(index_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::TableError(e.to_string()))?;
        }

        Ok(())
    }

    fn distance_operator(&self) -> &'static str {
        match self.metric {
            SimilarityMetric::Cosine => "<=>",
            SimilarityMetric::Dot => "<#>",
        }
    }

    /// Similarity from pgvector's distance expression: cosine similarity is
    /// `1 - distance`; `<#>` returns the negated inner product.
    fn score_expression(&self) -> &'static str {
        match self.metric {
            SimilarityMetric::Cosine => "1 - (embedding <=> $1)",
            SimilarityMetric::Dot => "-(embedding <#> $1)",
        }
    }
}

#[async_trait]
impl VectorStore for PgVectorBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn replace_document(
        &self,
        kb_id: &str,
        document_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError> {
        let delete = format!(
            "DELETE FROM {} WHERE kb_id = $1 AND document_id = $2",
            self.table
        );
        let insert = format!(
            r#"
            INSERT INTO {} (id, kb_id, document_id, chunk_index, total_chunks, content,
                          embedding, source_kind, source_location, checksum, created_at,
                          start_offset, end_offset)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
            self.table
        );

        // Old and new chunks for a document must never coexist: delete and
        // insert happen in one transaction, so a failure rolls back to the
        // prior version.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        sqlx::query(&delete)
            .bind(kb_id)
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        for chunk in chunks {
            let id = uuid::Uuid::parse_str(&chunk.id)
                .map_err(|e| VectorStoreError::UpsertError(format!("invalid UUID: {}", e)))?;
            let embedding = Vector::from(chunk.embedding);

            sqlx::query(&insert)
                .bind(id)
                .bind(kb_id)
                .bind(&chunk.document_id)
                .bind(chunk.chunk_index as i32)
                .bind(chunk.total_chunks as i32)
                .bind(&chunk.content)
                .bind(&embedding)
                .bind(chunk.source.kind.to_string())
                .bind(&chunk.source.location)
                .bind(&chunk.checksum)
                .bind(&chunk.created_at)
                .bind(chunk.start_offset as i64)
                .bind(chunk.end_offset as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        kb_id: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<RetrievedChunk>, VectorStoreError> {
        let embedding = Vector::from(query_vector);

        let query = format!(
            r#"
            SELECT
                id::text as chunk_id,
                document_id,
                chunk_index,
                content,
                source_kind,
                source_location,
                {score} as score
            FROM {table}
            WHERE kb_id = $2
            ORDER BY embedding {op} $1
            LIMIT {limit}
            "#,
            score = self.score_expression(),
            table = self.table,
            op = self.distance_operator(),
            limit = limit
        );

        let rows = sqlx::query(&query)
            .bind(&embedding)
            .bind(kb_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let results = rows
            .into_iter()
            .map(|row: PgRow| {
                let source_kind: String = row.get("source_kind");
                let kind = match source_kind.as_str() {
                    "url" => SourceKind::Url,
                    _ => SourceKind::File,
                };
                let score: f64 = row.get("score");

                RetrievedChunk {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    chunk_index: row.get::<i32, _>("chunk_index") as u32,
                    content: row.get("content"),
                    source: Source {
                        kind,
                        location: row.get("source_location"),
                    },
                    score: score as f32,
                }
            })
            .collect();

        Ok(results)
    }

    async fn delete_document(
        &self,
        kb_id: &str,
        document_id: &str,
    ) -> Result<(), VectorStoreError> {
        let query = format!(
            "DELETE FROM {} WHERE kb_id = $1 AND document_id = $2",
            self.table
        );

        sqlx::query(&query)
            .bind(kb_id)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    async fn count(&self, kb_id: &str) -> Result<u64, VectorStoreError> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE kb_id = $1", self.table);
        let row: (i64,) = sqlx::query_as(&query)
            .bind(kb_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        Ok(row.0 as u64)
    }

    async fn list_documents(&self, kb_id: &str) -> Result<Vec<DocumentSummary>, VectorStoreError> {
        let query = format!(
            r#"
            SELECT document_id, MIN(source_location) as source_location, COUNT(*) as chunk_count
            FROM {}
            WHERE kb_id = $1
            GROUP BY document_id
            ORDER BY document_id
            "#,
            self.table
        );

        let rows = sqlx::query(&query)
            .bind(kb_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let summaries = rows
            .into_iter()
            .map(|row: PgRow| DocumentSummary {
                document_id: row.get("document_id"),
                source_location: row.get("source_location"),
                chunk_count: row.get::<i64, _>("chunk_count") as u64,
            })
            .collect();

        Ok(summaries)
    }

    async fn clear(&self, kb_id: &str) -> Result<(), VectorStoreError> {
        let query = format!("DELETE FROM {} WHERE kb_id = $1", self.table);
        sqlx::query(&query)
            .bind(kb_id)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(())
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }
}
