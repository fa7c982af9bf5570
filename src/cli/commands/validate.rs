//! Validate command implementation

use crate::cli::utils;
use anyhow::Result;
use catalog_crd::find_yaml_files;
use clap::{ArgMatches, Command};
use tracing::info;

pub fn command() -> Command {
    Command::new("validate")
        .about("Validate configuration file")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file path")
                .value_name("FILE"),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    info!("Validating configuration file");

    let config = utils::load_config(matches)?;

    println!("Configuration file is valid!");
    println!("Version: {}", config.version);
    println!("Sources: {}", config.sources.len());
    println!(
        "Output: {} ({:?})",
        config.output.path.display(),
        config.output.format
    );
    println!("Publish target: {:?}", config.generation.publish.target);

    for source in &config.sources {
        match find_yaml_files(&source.path) {
            Ok(files) => println!(
                "  - {} ({}): {} manifest files",
                source.cluster,
                source.path.display(),
                files.len()
            ),
            Err(e) => println!("  - {} ({}): {e}", source.cluster, source.path.display()),
        }
    }

    if config.generation.crds.is_conflicting() {
        println!("Warning: both CRD targets and a CRD label selector are set; no CRDs will be processed");
    }

    Ok(())
}
