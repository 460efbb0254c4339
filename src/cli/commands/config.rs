//! `kbchat config`: inspect and initialize configuration.

use clap::Subcommand;

use crate::cli::output::success;
use crate::error::{AppError, ConfigError};
use crate::models::Config;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a config file with the current defaults
    Init,

    /// Print the config file location
    Path,
}

pub fn run(config: &Config, command: ConfigCommand) -> Result<(), AppError> {
    match command {
        ConfigCommand::Show => {
            let rendered = toml::to_string_pretty(config).map_err(ConfigError::from)?;
            print!("{}", rendered);
        }
        ConfigCommand::Init => {
            config.save()?;
            let path = Config::config_path().ok_or_else(|| {
                ConfigError::PathError("could not determine config directory".to_string())
            })?;
            success(&format!("wrote {}", path.display()));
        }
        ConfigCommand::Path => {
            let path = Config::config_path().ok_or_else(|| {
                ConfigError::PathError("could not determine config directory".to_string())
            })?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
