//! Source configuration definitions

use anyhow::{anyhow, Result};
use catalog_crd::ClusterRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A directory of manifests exported from one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Cluster name, used for provenance and the publish cluster list
    pub cluster: String,

    /// API server URL; the cluster name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Directory holding XRD, CRD and Composition manifests
    pub path: PathBuf,
}

impl Source {
    pub fn validate(&self) -> Result<()> {
        if self.cluster.is_empty() {
            return Err(anyhow!("Source cluster name cannot be empty"));
        }

        if self.path.as_os_str().is_empty() {
            return Err(anyhow!(
                "Source path cannot be empty for cluster {}",
                self.cluster
            ));
        }

        if let Some(url) = &self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow!("Invalid cluster URL format: {}", url));
            }
        }

        Ok(())
    }

    pub fn cluster_ref(&self) -> ClusterRef {
        let cluster = ClusterRef::new(self.cluster.clone());
        match &self.url {
            Some(url) => cluster.with_url(url.clone()),
            None => cluster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: Option<&str>) -> Source {
        Source {
            cluster: "prod".to_string(),
            url: url.map(str::to_string),
            path: PathBuf::from("./manifests/prod"),
        }
    }

    #[test]
    fn test_source_validation() {
        assert!(source(None).validate().is_ok());
        assert!(source(Some("https://prod.example.com:6443")).validate().is_ok());
        assert!(source(Some("prod.example.com")).validate().is_err());

        let mut unnamed = source(None);
        unnamed.cluster.clear();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_cluster_ref() {
        assert_eq!(source(None).cluster_ref().identifier(), "prod");
        assert_eq!(
            source(Some("https://prod.example.com")).cluster_ref().identifier(),
            "https://prod.example.com"
        );
    }
}
