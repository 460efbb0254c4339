//! Service layer: the moving parts behind the CLI.

pub mod chunker;
pub mod composer;
pub mod embedding;
pub mod ingest;
pub mod llm;
pub mod retriever;
pub mod session_store;
pub mod vector_store;
pub mod web_search;
