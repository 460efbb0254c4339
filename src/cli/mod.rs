//! Command-line interface.

pub mod commands;
pub mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::error::AppError;
use crate::models::{Config, OutputFormat};
use crate::services::embedding::{Embedder, create_embedder};
use crate::services::session_store::SessionStore;
use crate::services::vector_store::{VectorStore, create_backend};

#[derive(Parser)]
#[command(
    name = "kbchat",
    version,
    about = "Ingest documents into knowledge bases and chat over them"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Knowledge base to operate on
    #[arg(long, global = true, default_value = "default")]
    pub kb: String,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check connectivity of the configured backends
    Status,

    /// Ingest files, directories, or URLs into a knowledge base
    Ingest {
        /// File paths, directories, or http(s) URLs
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Ask a question against a knowledge base
    Ask {
        /// The question (joined with spaces)
        #[arg(required = true)]
        question: Vec<String>,

        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,

        /// Show the retrieved source passages alongside the answer
        #[arg(long)]
        show_sources: bool,
    },

    /// Inspect or modify a knowledge base
    #[command(subcommand)]
    Kb(commands::kb::KbCommand),

    /// Manage conversation sessions
    #[command(subcommand)]
    Session(commands::session::SessionCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load()?;

    match cli.command {
        Command::Status => commands::status::run(&config, &cli.kb).await,
        Command::Ingest { sources } => {
            commands::ingest::run(&config, &cli.kb, &sources, cli.format).await
        }
        Command::Ask {
            question,
            session,
            show_sources,
        } => {
            let question = question.join(" ");
            commands::ask::run(&config, &cli.kb, &question, session, show_sources, cli.format)
                .await
        }
        Command::Kb(command) => commands::kb::run(&config, &cli.kb, command, cli.format).await,
        Command::Session(command) => commands::session::run(&config, command).await,
        Command::Config(command) => commands::config::run(&config, command),
    }
}

pub(crate) fn open_embedder(config: &Config) -> Result<Arc<dyn Embedder>, AppError> {
    Ok(create_embedder(&config.embedding)?)
}

pub(crate) async fn open_store(config: &Config) -> Result<Arc<dyn VectorStore>, AppError> {
    Ok(create_backend(&config.vector_store, config.embedding.dimension).await?)
}

pub(crate) fn open_sessions(config: &Config) -> Result<Arc<SessionStore>, AppError> {
    let path = config.session.resolved_db_path()?;
    Ok(Arc::new(SessionStore::open(&path)?))
}
