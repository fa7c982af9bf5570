//! Configuration types for the generator
//!
//! Values here are already resolved; the generator never loads configuration
//! itself and only uses these as branch conditions.

use crate::entity::is_entity_name_char;
use anyhow::{anyhow, Result};
use catalog_crd::LabelSelector;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANNOTATION_PREFIX: &str = "terasky.backstage.io";
pub const DEFAULT_OWNER: &str = "kubernetes-auto-ingested";

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Prefix for the machine-readable annotations added to every entity
    pub annotation_prefix: String,

    /// Prepended to every generated entity name
    pub name_prefix: String,

    /// Replace literal schema defaults with placeholder text
    pub convert_defaults_to_placeholders: bool,

    /// Owner recorded on every generated entity
    pub owner: String,

    /// Where created manifests are published
    pub publish: PublishConfig,

    /// Which CRDs get entities
    pub crds: CrdSelection,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.annotation_prefix.is_empty() {
            return Err(anyhow!("Annotation prefix cannot be empty"));
        }
        if self.owner.is_empty() {
            return Err(anyhow!("Owner cannot be empty"));
        }
        let prefix_starts_ok = self
            .name_prefix
            .chars()
            .next()
            .map_or(true, |c| c.is_ascii_alphanumeric());
        if !prefix_starts_ok || !self.name_prefix.chars().all(is_entity_name_char) {
            return Err(anyhow!(
                "Name prefix '{}' must start with an alphanumeric and contain only alphanumerics, '-', '_' and '.'",
                self.name_prefix
            ));
        }
        self.publish.validate()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            name_prefix: String::new(),
            convert_defaults_to_placeholders: false,
            owner: DEFAULT_OWNER.to_string(),
            publish: PublishConfig::default(),
            crds: CrdSelection::default(),
        }
    }
}

/// Publication settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub target: PublishTarget,

    /// Let users pick repository and branch in the form
    pub allow_repo_selection: bool,

    /// Hosts offered by the repository picker
    pub allowed_hosts: Vec<String>,

    /// Fixed repository used when selection is not allowed
    pub repo_url: Option<String>,

    /// Fixed (or default) target branch
    pub target_branch: String,
}

impl PublishConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target.publishes() && self.allow_repo_selection && self.allowed_hosts.is_empty() {
            return Err(anyhow!(
                "Repository selection is allowed but no allowed hosts are configured"
            ));
        }
        if self.target_branch.is_empty() {
            return Err(anyhow!("Target branch cannot be empty"));
        }
        Ok(())
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            target: PublishTarget::default(),
            allow_repo_selection: false,
            allowed_hosts: vec!["github.com".to_string()],
            repo_url: None,
            target_branch: "main".to_string(),
        }
    }
}

/// Publish target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishTarget {
    #[default]
    Github,
    Gitlab,
    Bitbucket,
    BitbucketCloud,
    /// Render the manifest only, never push it
    Yaml,
}

/// Publish action and the output field holding the review link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishAction {
    pub action: &'static str,
    pub link_field: &'static str,
}

const PUBLISH_ACTIONS: &[(PublishTarget, PublishAction)] = &[
    (
        PublishTarget::Github,
        PublishAction {
            action: "publish:github:pull-request",
            link_field: "remoteUrl",
        },
    ),
    (
        PublishTarget::Gitlab,
        PublishAction {
            action: "publish:gitlab:merge-request",
            link_field: "mergeRequestUrl",
        },
    ),
    (
        PublishTarget::Bitbucket,
        PublishAction {
            action: "publish:bitbucketServer:pull-request",
            link_field: "pullRequestUrl",
        },
    ),
    (
        PublishTarget::BitbucketCloud,
        PublishAction {
            action: "publish:bitbucketCloud:pull-request",
            link_field: "pullRequestUrl",
        },
    ),
];

impl PublishTarget {
    /// Publish action for this target; `None` for `yaml`
    pub fn action(&self) -> Option<PublishAction> {
        PUBLISH_ACTIONS
            .iter()
            .find(|(target, _)| target == self)
            .map(|(_, action)| *action)
    }

    pub fn publishes(&self) -> bool {
        self.action().is_some()
    }
}

/// CRD selection; `targets` and `label_selector` are mutually exclusive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrdSelection {
    /// Glob patterns over CRD names
    pub targets: Vec<String>,

    pub label_selector: Option<LabelSelector>,
}

impl CrdSelection {
    pub fn is_conflicting(&self) -> bool {
        !self.targets.is_empty() && self.label_selector.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PublishTarget::Github, Some(("publish:github:pull-request", "remoteUrl")))]
    #[case(PublishTarget::Gitlab, Some(("publish:gitlab:merge-request", "mergeRequestUrl")))]
    #[case(PublishTarget::Bitbucket, Some(("publish:bitbucketServer:pull-request", "pullRequestUrl")))]
    #[case(PublishTarget::BitbucketCloud, Some(("publish:bitbucketCloud:pull-request", "pullRequestUrl")))]
    #[case(PublishTarget::Yaml, None)]
    fn test_publish_table(
        #[case] target: PublishTarget,
        #[case] expected: Option<(&str, &str)>,
    ) {
        assert_eq!(target.action().map(|a| (a.action, a.link_field)), expected);
        assert_eq!(target.publishes(), expected.is_some());
    }

    #[test]
    fn test_default_target_is_github() {
        assert_eq!(PublishTarget::default(), PublishTarget::Github);
    }

    #[test]
    fn test_target_names() {
        let target: PublishTarget = serde_yaml::from_str("bitbucketCloud").unwrap();
        assert_eq!(target, PublishTarget::BitbucketCloud);
        assert_eq!(serde_yaml::to_string(&PublishTarget::Yaml).unwrap().trim(), "yaml");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GeneratorConfig =
            serde_yaml::from_str("publish:\n  target: gitlab\n").unwrap();
        assert_eq!(config.publish.target, PublishTarget::Gitlab);
        assert_eq!(config.publish.target_branch, "main");
        assert_eq!(config.annotation_prefix, DEFAULT_ANNOTATION_PREFIX);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case("", true)]
    #[case("team-", true)]
    #[case("platform.eng_", true)]
    #[case("-team", false)]
    #[case("team a-", false)]
    #[case("team/", false)]
    fn test_name_prefix_validation(#[case] prefix: &str, #[case] valid: bool) {
        let config = GeneratorConfig {
            name_prefix: prefix.to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().is_ok(), valid);
    }

    #[test]
    fn test_conflicting_crd_selection() {
        let selection = CrdSelection {
            targets: vec!["*.example.com".to_string()],
            label_selector: Some(LabelSelector::default()),
        };
        assert!(selection.is_conflicting());
        assert!(!CrdSelection::default().is_conflicting());
    }
}
