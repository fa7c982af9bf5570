//! Main configuration structure and implementation

use anyhow::{anyhow, Context, Result};
use catalog_generator::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{OutputConfig, Source};

pub const CONFIG_VERSION: &str = "1.0";

/// File names probed, in order, when no configuration path is given
pub const DEFAULT_CONFIG_FILES: [&str; 4] = [
    ".catalog-gen.yaml",
    ".catalog-gen.yml",
    "catalog-gen.yaml",
    "catalog-gen.yml",
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Manifest directories to read, one per cluster
    pub sources: Vec<Source>,

    /// Settings handed to the generator as resolved values
    #[serde(default)]
    pub generation: GeneratorConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(anyhow!(
                "Unsupported configuration version: {}",
                self.version
            ));
        }

        if self.sources.is_empty() {
            return Err(anyhow!("At least one source must be configured"));
        }

        for source in &self.sources {
            source.validate()?;
        }

        let mut clusters: Vec<&str> = self.sources.iter().map(|s| s.cluster.as_str()).collect();
        clusters.sort_unstable();
        if let Some(pair) = clusters.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(anyhow!("Cluster '{}' is configured more than once", pair[0]));
        }

        self.generation.validate()?;
        self.output.validate()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            sources: Vec::new(),
            generation: GeneratorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
