//! Catalog Generator Library
//!
//! Turns Kubernetes CustomResourceDefinitions and Crossplane
//! CompositeResourceDefinitions into software-catalog Template and API
//! entities.

pub mod cli;
pub mod config;
pub mod driver;
pub mod utils;

pub use config::{Config, OutputConfig, OutputFormat, Source};
pub use driver::{DiscoveredObject, Discovery, TransformDriver};

pub use catalog_crd::{ClusterRef, DescriptorParser, ResourceDescriptor};
pub use catalog_generator::{
    CatalogEntity, GeneratorConfig, TransformReport, TransformStatistics, TransformWarning,
};

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Main application context that coordinates all components
pub struct CatalogGen {
    config: Config,
    parser: DescriptorParser,
    driver: TransformDriver,
}

impl CatalogGen {
    /// Create a new CatalogGen instance with the given configuration
    pub fn new(config: Config) -> CatalogGenResult<Self> {
        config
            .validate()
            .map_err(|e| CatalogGenError::Config(format!("{e:#}")))?;

        let driver = TransformDriver::new(config.generation.clone());
        Ok(Self {
            config,
            parser: DescriptorParser::new(),
            driver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read every configured source directory.
    ///
    /// A missing source directory fails discovery; unreadable or malformed
    /// files inside one are skipped and carried as defects.
    pub fn discover(&self) -> CatalogGenResult<Discovery> {
        let mut discovery = Discovery::default();

        for source in &self.config.sources {
            if !source.path.is_dir() {
                return Err(CatalogGenError::Discovery(format!(
                    "{}: source directory {} does not exist",
                    source.cluster,
                    source.path.display()
                )));
            }

            let cluster = source.cluster_ref();
            let loaded = self
                .parser
                .load_directory(&source.path)
                .map_err(|e| CatalogGenError::Discovery(format!("{}: {e:#}", source.cluster)))?;

            debug!(
                "Discovered {} objects for cluster {}",
                loaded.documents.len(),
                source.cluster
            );
            discovery.objects.extend(
                loaded
                    .documents
                    .into_iter()
                    .map(|document| DiscoveredObject::new(cluster.clone(), document)),
            );
            discovery
                .defects
                .extend(loaded.failures.into_iter().map(|failure| {
                    TransformWarning::StructuralDefect {
                        resource: failure.path.display().to_string(),
                        reason: format!("{:#}", failure.error),
                    }
                }));
        }

        Ok(discovery)
    }

    /// Discover and transform, without writing anything
    pub fn generate(&self) -> CatalogGenResult<TransformReport> {
        info!("Starting catalog entity generation");
        let start_time = Instant::now();

        let discovery = self.discover()?;
        let report = self.driver.transform_discovery(discovery);

        info!(
            "Generation completed in {}",
            utils::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    /// Generate and write the batch to the configured output
    pub async fn run(&self) -> Result<TransformReport> {
        let report = self.generate()?;
        let rendered = render(&report.entities, self.config.output.format)?;
        write_output(&self.config.output.path, &rendered).await?;
        Ok(report)
    }
}

/// Render entities as a YAML stream or a JSON array
pub fn render(entities: &[CatalogEntity], format: OutputFormat) -> CatalogGenResult<String> {
    match format {
        OutputFormat::Yaml => {
            let documents = entities
                .iter()
                .map(serde_yaml::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(documents.join("---\n"))
        }
        OutputFormat::Json => {
            let mut rendered = serde_json::to_string_pretty(entities)?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

/// Write rendered output, creating parent directories as needed
pub async fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Application error types
#[derive(thiserror::Error, Debug)]
pub enum CatalogGenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Discovery failed: {0}")]
    Discovery(String),
}

/// Result type for the main application
pub type CatalogGenResult<T> = Result<T, CatalogGenError>;
