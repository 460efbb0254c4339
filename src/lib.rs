//! kbchat: knowledge-base ingestion and retrieval-grounded chat.
//!
//! Documents (files, directories, URLs) are extracted, chunked with overlap,
//! embedded, and stored in a vector store partitioned by knowledge base.
//! Questions retrieve the closest chunks, which ground an LLM answer;
//! conversations persist as append-only sessions.

pub mod cli;
pub mod error;
pub mod extract;
pub mod models;
pub mod services;
pub mod utils;
