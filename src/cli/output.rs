//! Terminal output rendering for the CLI.

use console::style;

use crate::models::{OutputFormat, RetrievedChunk};
use crate::services::composer::Answer;
use crate::services::ingest::IngestReport;
use crate::services::session_store::SessionSummary;
use crate::services::vector_store::DocumentSummary;

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

pub fn print_answer(answer: &Answer, format: OutputFormat, show_sources: bool) {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "session_id": answer.session_id,
                "answer": answer.text,
                "used_fallback": answer.used_fallback,
                "sources": answer.retrieval.hits.iter().map(source_json).collect::<Vec<_>>(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Markdown => {
            println!("{}\n", answer.text);
            if show_sources && !answer.retrieval.is_empty() {
                println!("## Sources\n");
                for hit in &answer.retrieval.hits {
                    println!("- `{}` (score {:.2})", hit.source, hit.score);
                }
            }
            println!("\n_session: {}_", answer.session_id);
        }
        OutputFormat::Text => {
            println!("{}", answer.text);
            if answer.used_fallback {
                println!();
                warning("no relevant knowledge-base passages; answer may rely on web results");
            }
            if show_sources && !answer.retrieval.is_empty() {
                println!("\n{}", style("Sources:").bold());
                for hit in &answer.retrieval.hits {
                    println!(
                        "  {} {} {}",
                        style(format!("[{:.2}]", hit.score)).dim(),
                        hit.source,
                        style(format!("(chunk {})", hit.chunk_index)).dim()
                    );
                }
            }
            println!("\n{}", style(format!("session: {}", answer.session_id)).dim());
        }
    }
}

fn source_json(hit: &RetrievedChunk) -> serde_json::Value {
    serde_json::json!({
        "source": hit.source.location,
        "document_id": hit.document_id,
        "chunk_index": hit.chunk_index,
        "score": hit.score,
    })
}

pub fn print_ingest_report(report: &IngestReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        let value = serde_json::json!({
            "succeeded": report.succeeded.iter().map(|d| serde_json::json!({
                "document_id": d.document_id,
                "source": d.source.location,
                "chunks": d.chunk_count,
            })).collect::<Vec<_>>(),
            "failed": report.failed.iter().map(|f| serde_json::json!({
                "source": f.source.location,
                "error": f.error.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
        return;
    }

    for doc in &report.succeeded {
        success(&format!(
            "{} ({} chunks)",
            doc.source.location, doc.chunk_count
        ));
    }
    for failed in &report.failed {
        failure(&format!("{}: {}", failed.source.location, failed.error));
    }
    println!(
        "\n{} document(s) ingested, {} chunk(s), {} failed",
        report.succeeded.len(),
        report.total_chunks(),
        report.failed.len()
    );
}

pub fn print_documents(kb_id: &str, documents: &[DocumentSummary], format: OutputFormat) {
    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(documents).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    if documents.is_empty() {
        println!("knowledge base '{}' is empty", kb_id);
        return;
    }

    println!("{}", style(format!("knowledge base '{}':", kb_id)).bold());
    for doc in documents {
        println!(
            "  {}  {}  {}",
            style(&doc.document_id).dim(),
            doc.source_location,
            style(format!("{} chunks", doc.chunk_count)).dim()
        );
    }
}

pub fn print_sessions(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("no sessions");
        return;
    }

    for session in sessions {
        let flag = if session.archived {
            style("archived").yellow().to_string()
        } else {
            style("active").green().to_string()
        };
        println!(
            "  {}  {:>3} turns  {}  last active {}",
            session.id, session.turn_count, flag, session.last_active_at
        );
    }
}
