//! Generate command implementation

use crate::cli::utils;
use crate::{render, OutputFormat, TransformReport};
use anyhow::Result;
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub fn command() -> Command {
    Command::new("generate")
        .about("Generate catalog entities from configured sources")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file path")
                .value_name("FILE"),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file")
                .value_name("FILE"),
        )
        .arg(
            clap::Arg::new("format")
                .long("format")
                .help("Output format")
                .value_parser(["yaml", "json"]),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .help("Don't write files")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    info!("Starting catalog entity generation");

    let mut config = utils::load_config(matches)?;

    if let Some(output_path) = matches.get_one::<String>("output") {
        config.output.path = PathBuf::from(output_path);
    }

    if let Some(format) = matches.get_one::<String>("format") {
        config.output.format = format.parse::<OutputFormat>()?;
    }

    let app = utils::create_app(config)?;

    if matches.get_flag("dry-run") {
        info!("Dry run mode - no files will be written");
        println!("Dry run mode - no files will be written");

        let report = app.generate()?;
        render(&report.entities, app.config().output.format)?;

        print_summary(&report);
        println!(
            "Entities that would be written to {}: {}",
            app.config().output.path.display(),
            report.entities.len()
        );
        return Ok(());
    }

    let report = app.run().await?;

    println!("Generation completed successfully!");
    print_summary(&report);
    println!("Output written to {}", app.config().output.path.display());

    Ok(())
}

fn print_summary(report: &TransformReport) {
    let stats = &report.statistics;
    println!(
        "Resources processed: {} ({} XRDs, {} CRDs)",
        stats.resources_processed, stats.xrds, stats.crds
    );
    println!("Templates generated: {}", stats.templates_generated);
    println!("APIs generated: {}", stats.apis_generated);

    if stats.entities_dropped > 0 {
        println!("Entities dropped: {}", stats.entities_dropped);
    }

    if !report.warnings.is_empty() {
        println!("Warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            println!("  Warning: {warning}");
        }
    }
}
