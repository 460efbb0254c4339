//! `kbchat status`: check every configured backend.

use crate::cli::output::{failure, success, warning};
use crate::cli::{open_embedder, open_sessions, open_store};
use crate::error::AppError;
use crate::models::{Config, EmbeddingStrategy, VectorDriver};

pub async fn run(config: &Config, kb_id: &str) -> Result<(), AppError> {
    let mut healthy = true;

    match open_embedder(config) {
        Ok(embedder) => {
            let strategy = match config.embedding.strategy {
                EmbeddingStrategy::Remote => "remote",
                EmbeddingStrategy::Local => "local",
            };
            success(&format!(
                "embedder: {} ({}, {} dims)",
                embedder.model_id(),
                strategy,
                embedder.dimension()
            ));
        }
        Err(error) => {
            healthy = false;
            failure(&format!("embedder: {}", error));
        }
    }

    match open_store(config).await {
        Ok(store) => match store.health_check().await {
            Ok(true) => {
                let driver = match config.vector_store.driver {
                    VectorDriver::Pgvector => "pgvector",
                    VectorDriver::Memory => "memory",
                };
                let chunks = store.count(kb_id).await.unwrap_or(0);
                success(&format!(
                    "vector store: {} ({} chunks in '{}')",
                    driver, chunks, kb_id
                ));
            }
            Ok(false) | Err(_) => {
                healthy = false;
                failure("vector store: unhealthy");
            }
        },
        Err(error) => {
            healthy = false;
            failure(&format!("vector store: {}", error));
        }
    }

    match open_sessions(config) {
        Ok(sessions) => {
            let count = sessions.list().map(|s| s.len()).unwrap_or(0);
            success(&format!("session store: {} session(s)", count));
        }
        Err(error) => {
            healthy = false;
            failure(&format!("session store: {}", error));
        }
    }

    match config.web_search.url {
        Some(ref url) => success(&format!("web search fallback: {}", url)),
        None => warning("web search fallback: not configured"),
    }

    if !healthy {
        return Err(AppError::Other("one or more backends unavailable".to_string()));
    }
    Ok(())
}
