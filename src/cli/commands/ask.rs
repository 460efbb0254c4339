//! `kbchat ask`: answer a question from a knowledge base.

use crate::cli::output::print_answer;
use crate::cli::{open_embedder, open_sessions, open_store};
use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::composer::AnswerComposer;
use crate::services::llm::create_backend;
use crate::services::retriever::Retriever;
use crate::services::session_store::SessionStore;
use crate::services::web_search::create_search;

pub async fn run(
    config: &Config,
    kb_id: &str,
    question: &str,
    session: Option<String>,
    show_sources: bool,
    format: OutputFormat,
) -> Result<(), AppError> {
    let embedder = open_embedder(config)?;
    let store = open_store(config).await?;
    let sessions = open_sessions(config)?;

    let chat = create_backend(&config.generation)
        .map_err(|e| AppError::Other(e.to_string()))?;
    let search = create_search(&config.web_search)
        .map_err(|e| AppError::Other(e.to_string()))?;

    let retriever = Retriever::new(&config.retrieval, embedder, store);
    let composer = AnswerComposer::new(&config.session, retriever, chat, sessions, search);

    let session_id = session.unwrap_or_else(SessionStore::new_session_id);
    let answer = composer
        .ask(kb_id, &session_id, question)
        .await
        .map_err(AppError::Compose)?;

    print_answer(&answer, format, show_sources);
    Ok(())
}
