//! `kbchat ingest`: put documents into a knowledge base.

use crate::cli::output::print_ingest_report;
use crate::cli::{open_embedder, open_store};
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::ingest::{IngestionPipeline, expand_sources};

pub async fn run(
    config: &Config,
    kb_id: &str,
    inputs: &[String],
    format: OutputFormat,
) -> Result<(), AppError> {
    let sources = expand_sources(inputs).map_err(AppError::Ingest)?;

    let embedder = open_embedder(config)?;
    let store = open_store(config).await?;
    let pipeline = IngestionPipeline::new(&config.ingestion, embedder, store)
        .map_err(AppError::Ingest)?;

    let report = pipeline
        .ingest_batch(kb_id, &sources)
        .await
        .map_err(AppError::Ingest)?;

    print_ingest_report(&report, format);

    if report.succeeded.is_empty() {
        return Err(AppError::Other("no documents were ingested".to_string()));
    }
    Ok(())
}
