//! `kbchat session`: manage conversation history.

use std::time::Duration;

use clap::Subcommand;
use console::style;

use crate::cli::open_sessions;
use crate::cli::output::{print_sessions, success};
use crate::error::AppError;
use crate::models::Config;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List all sessions
    List,

    /// Show the full history of a session
    Show {
        /// Session id
        id: String,
    },

    /// Delete a session and its history
    Delete {
        /// Session id
        id: String,
    },

    /// Archive sessions idle longer than the configured threshold
    Archive,
}

pub async fn run(config: &Config, command: SessionCommand) -> Result<(), AppError> {
    let sessions = open_sessions(config)?;

    match command {
        SessionCommand::List => {
            let summaries = sessions.list()?;
            print_sessions(&summaries);
        }
        SessionCommand::Show { id } => {
            let session = sessions.load(&id)?;
            let state = if session.archived { " (archived)" } else { "" };
            println!(
                "{}",
                style(format!("session {}{}", session.id, state)).bold()
            );
            for turn in &session.turns {
                println!(
                    "\n{} {}",
                    style(format!("[{}]", turn.role)).dim(),
                    turn.content
                );
            }
        }
        SessionCommand::Delete { id } => {
            sessions.delete(&id)?;
            success(&format!("deleted session {}", id));
        }
        SessionCommand::Archive => {
            let archived =
                sessions.archive_idle(Duration::from_secs(config.session.archive_after_secs))?;
            success(&format!("archived {} session(s)", archived));
        }
    }

    Ok(())
}
