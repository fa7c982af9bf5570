//! Init command implementation

use crate::config::{Source, DEFAULT_CONFIG_FILES};
use crate::utils::ensure_directory;
use crate::Config;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn command() -> Command {
    Command::new("init")
        .about("Initialize a new configuration file")
        .arg(
            clap::Arg::new("path")
                .short('p')
                .long("path")
                .help("Directory to create the configuration in")
                .value_name("DIR")
                .default_value("."),
        )
        .arg(
            clap::Arg::new("force")
                .short('f')
                .long("force")
                .help("Overwrite an existing configuration file")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let dir = matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let output_path = init_config(&dir, matches.get_flag("force"))?;

    println!("Configuration file created: {}", output_path.display());
    println!("Point each source at a directory of exported XRD, CRD and Composition manifests.");

    Ok(())
}

/// Write an example configuration into `dir`, returning its path
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    ensure_directory(dir)?;
    let output_path = dir.join(DEFAULT_CONFIG_FILES[0]);

    if output_path.exists() && !force {
        return Err(anyhow!(
            "{} already exists; use --force to overwrite it",
            output_path.display()
        ));
    }

    info!("Initializing configuration file: {:?}", output_path);
    create_example_config().save_to_file(&output_path)?;

    Ok(output_path)
}

fn create_example_config() -> Config {
    let mut config = Config::default();

    config.sources.push(Source {
        cluster: "local".to_string(),
        url: None,
        path: PathBuf::from("./manifests"),
    });

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = init_config(temp_dir.path(), false).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].cluster, "local");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        init_config(temp_dir.path(), false).unwrap();

        assert!(init_config(temp_dir.path(), false).is_err());
        assert!(init_config(temp_dir.path(), true).is_ok());
    }
}
