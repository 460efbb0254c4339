//! `kbchat kb`: inspect or modify a knowledge base.

use clap::Subcommand;

use crate::cli::output::{print_documents, success, warning};
use crate::cli::open_store;
use crate::error::AppError;
use crate::models::{Config, OutputFormat};

#[derive(Subcommand)]
pub enum KbCommand {
    /// List documents in the knowledge base
    List,

    /// Show the number of stored chunks
    Count,

    /// Remove a single document by id
    Remove {
        /// Document id as shown by `kb list`
        document: String,
    },

    /// Delete every document in the knowledge base
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(
    config: &Config,
    kb_id: &str,
    command: KbCommand,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = open_store(config).await?;

    match command {
        KbCommand::List => {
            let documents = store.list_documents(kb_id).await?;
            print_documents(kb_id, &documents, format);
        }
        KbCommand::Count => {
            let count = store.count(kb_id).await?;
            println!("{}", count);
        }
        KbCommand::Remove { document } => {
            store.delete_document(kb_id, &document).await?;
            success(&format!("removed document {}", document));
        }
        KbCommand::Clear { yes } => {
            if !yes {
                warning(&format!(
                    "this deletes every document in '{}'; re-run with --yes to confirm",
                    kb_id
                ));
                return Ok(());
            }
            store.clear(kb_id).await?;
            success(&format!("cleared knowledge base '{}'", kb_id));
        }
    }

    Ok(())
}
