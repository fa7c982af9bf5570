//! CLI command implementations

use anyhow::Result;
use clap::{ArgMatches, Command};

pub mod commands;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Create the CLI application
    pub fn app() -> Command {
        Command::new("catalog-gen")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Generate catalog Templates and APIs from CRDs and Crossplane XRDs")
            .subcommand_negates_reqs(true)
            .subcommand(commands::init::command())
            .subcommand(commands::generate::command())
            .subcommand(commands::validate::command())
    }

    /// Run the CLI application
    pub async fn run(matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("init", sub_matches)) => commands::init::run(sub_matches).await,
            Some(("generate", sub_matches)) => commands::generate::run(sub_matches).await,
            Some(("validate", sub_matches)) => commands::validate::run(sub_matches).await,
            _ => {
                let _ = Self::app().print_help();
                Ok(())
            }
        }
    }
}

/// Common CLI utilities
pub mod utils {
    use crate::config::DEFAULT_CONFIG_FILES;
    use anyhow::{anyhow, Result};
    use std::path::{Path, PathBuf};

    /// Get configuration file path from arguments or use default
    pub fn get_config_path(matches: &clap::ArgMatches) -> Result<PathBuf> {
        if let Some(config_path) = matches.get_one::<String>("config") {
            return Ok(PathBuf::from(config_path));
        }

        crate::utils::find_first_existing(Path::new("."), &DEFAULT_CONFIG_FILES).ok_or_else(|| {
            anyhow!("No configuration file found. Use --config to specify a file or create one with 'catalog-gen init'")
        })
    }

    /// Load configuration from file
    pub fn load_config(matches: &clap::ArgMatches) -> Result<crate::Config> {
        let config_path = get_config_path(matches)?;
        crate::Config::from_file(&config_path)
    }

    /// Create CatalogGen instance
    pub fn create_app(config: crate::Config) -> Result<crate::CatalogGen> {
        Ok(crate::CatalogGen::new(config)?)
    }
}
