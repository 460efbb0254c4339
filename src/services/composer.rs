//! Answer composition: retrieval-grounded chat over a knowledge base.
//!
//! The composer owns the full question lifecycle: retrieve context, window
//! the session history, assemble the prompt, generate, and persist both the
//! question and the answer. When retrieval comes back empty it falls back to
//! web search if configured, and otherwise tells the model to say so rather
//! than invent an answer.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ComposeError;
use crate::models::{RetrievalResult, SessionConfig, Turn, prompt_window};
use crate::services::llm::{ChatBackend, ChatMessage};
use crate::services::retriever::Retriever;
use crate::services::session_store::SessionStore;
use crate::services::web_search::{SearchResult, WebSearch};

const SYSTEM_PROMPT: &str = "You are a knowledge-base assistant. Answer the user's question using \
only the provided context. Cite the source of each fact you use. If the context does not contain \
the answer, say so plainly instead of guessing.";

const NO_CONTEXT_NOTE: &str = "No relevant passages were found in the knowledge base for this \
question. Tell the user the knowledge base has no information on this topic. Do not invent an \
answer.";

/// A grounded answer plus everything needed to display provenance.
#[derive(Debug)]
pub struct Answer {
    pub session_id: String,
    pub text: String,
    pub retrieval: RetrievalResult,
    pub web_results: Vec<SearchResult>,
    pub used_fallback: bool,
}

pub struct AnswerComposer {
    retriever: Retriever,
    chat: Arc<dyn ChatBackend>,
    sessions: Arc<SessionStore>,
    search: Option<Arc<dyn WebSearch>>,
    max_turns: usize,
    token_budget: usize,
}

impl AnswerComposer {
    pub fn new(
        config: &SessionConfig,
        retriever: Retriever,
        chat: Arc<dyn ChatBackend>,
        sessions: Arc<SessionStore>,
        search: Option<Arc<dyn WebSearch>>,
    ) -> Self {
        Self {
            retriever,
            chat,
            sessions,
            search,
            max_turns: config.max_turns as usize,
            token_budget: config.token_budget as usize,
        }
    }

    /// Answer a question within a knowledge base and session.
    ///
    /// History is persisted only after generation succeeds, so a failed
    /// generation leaves the session exactly as it was.
    pub async fn ask(
        &self,
        kb_id: &str,
        session_id: &str,
        question: &str,
    ) -> Result<Answer, ComposeError> {
        let retrieval = self.retriever.retrieve(kb_id, question).await?;

        let mut used_fallback = false;
        let mut web_results = Vec::new();
        if retrieval.is_empty() {
            used_fallback = true;
            if let Some(ref search) = self.search {
                match search.search(question).await {
                    Ok(results) => web_results = results,
                    Err(error) => {
                        warn!(%error, "web search fallback failed, answering without it");
                    }
                }
            }
        }

        let history = self.sessions.turns(session_id)?;
        let window = prompt_window(&history, self.max_turns, self.token_budget);
        let messages = build_messages(&retrieval, &web_results, window, question);

        let text = self.chat.complete(&messages).await?;

        self.sessions.append_turn(session_id, &Turn::user(question))?;
        self.sessions
            .append_turn(session_id, &Turn::assistant(text.clone()))?;

        info!(
            kb = kb_id,
            session = session_id,
            context_chunks = retrieval.len(),
            used_fallback,
            "answered question"
        );

        Ok(Answer {
            session_id: session_id.to_string(),
            text,
            retrieval,
            web_results,
            used_fallback,
        })
    }
}

/// Assemble the chat message list: system prompt with context, then the
/// windowed history, then the question.
fn build_messages(
    retrieval: &RetrievalResult,
    web_results: &[SearchResult],
    history: &[Turn],
    question: &str,
) -> Vec<ChatMessage> {
    let mut system = String::from(SYSTEM_PROMPT);

    if retrieval.is_empty() {
        system.push_str("\n\n");
        system.push_str(NO_CONTEXT_NOTE);
    } else {
        system.push_str("\n\nContext passages:\n");
        for (i, hit) in retrieval.hits.iter().enumerate() {
            system.push_str(&format!(
                "\n[{}] (source: {}, score: {:.2})\n{}\n",
                i + 1,
                hit.source,
                hit.score,
                hit.content
            ));
        }
    }

    if !web_results.is_empty() {
        system.push_str(
            "\n\nWeb search results (secondary, less trusted than knowledge-base passages):\n",
        );
        for result in web_results {
            system.push_str(&format!(
                "\n- {} ({})\n  {}\n",
                result.title, result.url, result.snippet
            ));
        }
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    for turn in history {
        messages.push(ChatMessage {
            role: turn.role,
            content: turn.content.clone(),
        });
    }
    messages.push(ChatMessage::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RetrievedChunk, Role, Source};

    fn hit(content: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: "c1".to_string(),
            document_id: "d1".to_string(),
            chunk_index: 0,
            content: content.to_string(),
            source: Source::file("/kb/doc.md"),
            score,
        }
    }

    #[test]
    fn context_lands_in_system_message() {
        let retrieval = RetrievalResult {
            query: "q".to_string(),
            hits: vec![hit("Rust is memory safe.", 0.91)],
        };
        let messages = build_messages(&retrieval, &[], &[], "is rust safe?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("Rust is memory safe."));
        assert!(messages[0].content.contains("/kb/doc.md"));
        assert_eq!(messages[1].content, "is rust safe?");
    }

    #[test]
    fn empty_retrieval_gets_no_context_note() {
        let retrieval = RetrievalResult::empty("q");
        let messages = build_messages(&retrieval, &[], &[], "anything?");

        assert!(messages[0].content.contains("No relevant passages"));
    }

    #[test]
    fn history_sits_between_system_and_question() {
        let retrieval = RetrievalResult::empty("q");
        let history = vec![Turn::user("earlier question"), Turn::assistant("earlier answer")];
        let messages = build_messages(&retrieval, &[], &history, "follow-up");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "follow-up");
    }

    #[test]
    fn web_results_are_marked_secondary() {
        let retrieval = RetrievalResult::empty("q");
        let results = vec![SearchResult {
            title: "Docs".to_string(),
            url: "https://example.com".to_string(),
            snippet: "a snippet".to_string(),
        }];
        let messages = build_messages(&retrieval, &results, &[], "q");

        assert!(messages[0].content.contains("less trusted"));
        assert!(messages[0].content.contains("https://example.com"));
    }
}
