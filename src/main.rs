use clap::Parser;
use tracing_subscriber::EnvFilter;

use kbchat::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "kbchat=debug" } else { "kbchat=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tokio::select! {
        result = cli::run(cli) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted");
            std::process::exit(130);
        }
    }

    Ok(())
}
