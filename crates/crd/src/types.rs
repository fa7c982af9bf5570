//! Resource descriptor types and data structures

use crate::schema::SchemaNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which kind of definition a descriptor was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    /// Crossplane CompositeResourceDefinition
    Xrd,

    /// Kubernetes CustomResourceDefinition
    Crd,
}

impl DescriptorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xrd => "xrd",
            Self::Crd => "crd",
        }
    }
}

impl std::fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource scope as declared on the definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceScope {
    Cluster,
    Namespaced,
    /// Crossplane v2 cluster-scoped XR that is still offered through a claim
    LegacyCluster,
}

impl ResourceScope {
    /// Lenient parse: anything that is not a known scope is treated as `Cluster`.
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "Namespaced" => Self::Namespaced,
            "LegacyCluster" => Self::LegacyCluster,
            _ => Self::Cluster,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cluster => "Cluster",
            Self::Namespaced => "Namespaced",
            Self::LegacyCluster => "LegacyCluster",
        }
    }
}

impl std::fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind and plural of a resource (or of its claim)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceNames {
    /// Kind (e.g., "XDatabase")
    pub kind: String,

    /// Plural name (e.g., "xdatabases")
    pub plural: String,
}

impl ResourceNames {
    pub fn new(kind: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            plural: plural.into(),
        }
    }
}

/// A cluster a definition was discovered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterRef {
    /// Cluster name
    pub name: String,

    /// API server URL, when the discovery collaborator knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ClusterRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Identifier used wherever a cluster must be addressed, falling back to its name
    pub fn identifier(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.name)
    }
}

/// A single API version of a definition
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    /// Version name (e.g., "v1alpha1")
    pub name: String,

    /// Whether this version is served by the API server
    pub served: bool,

    /// Whether this is the storage version
    pub storage: bool,

    /// OpenAPI v3 schema declared on the definition
    pub schema: Option<SchemaNode>,

    /// Concrete schema produced for this version by a generator
    /// (for XRDs, the composite CRD Crossplane derives from it)
    pub generated_schema: Option<SchemaNode>,
}

impl VersionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            served: true,
            storage: false,
            schema: None,
            generated_schema: None,
        }
    }

    /// The `spec` property of the declared schema, if any
    pub fn spec_schema(&self) -> Option<&SchemaNode> {
        self.schema.as_ref().and_then(|s| s.property("spec"))
    }

    /// Schema used for API documents: the generated one wins when both exist
    pub fn api_schema(&self) -> Option<&SchemaNode> {
        self.generated_schema.as_ref().or(self.schema.as_ref())
    }
}

/// A parsed CRD or XRD
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// Definition kind
    pub kind: DescriptorKind,

    /// Full definition name (e.g., "xdatabases.example.org")
    pub name: String,

    /// API group
    pub group: String,

    /// Names of the resource itself
    pub names: ResourceNames,

    /// Claim names (v1 XRDs and v2 LegacyCluster XRDs)
    pub claim_names: Option<ResourceNames>,

    /// Scope exactly as declared; `None` when the field is absent
    pub declared_scope: Option<ResourceScope>,

    /// API versions with their schemas
    pub versions: Vec<VersionDescriptor>,

    /// Clusters this definition was discovered on, in discovery order
    pub clusters: Vec<ClusterRef>,

    /// Labels of the definition object
    pub labels: BTreeMap<String, String>,

    /// Composition preselected by the XRD (`spec.defaultCompositionRef`)
    pub default_composition: Option<String>,

    /// Compositions known to implement this XRD
    pub compositions: Vec<String>,
}

impl ResourceDescriptor {
    /// Create a descriptor with no versions, scope, or clusters
    pub fn new(
        kind: DescriptorKind,
        name: impl Into<String>,
        group: impl Into<String>,
        names: ResourceNames,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            group: group.into(),
            names,
            claim_names: None,
            declared_scope: None,
            versions: Vec::new(),
            clusters: Vec::new(),
            labels: BTreeMap::new(),
            default_composition: None,
            compositions: Vec::new(),
        }
    }

    pub fn is_xrd(&self) -> bool {
        self.kind == DescriptorKind::Xrd
    }

    pub fn is_crd(&self) -> bool {
        self.kind == DescriptorKind::Crd
    }

    /// Get all served versions
    pub fn served_versions(&self) -> impl Iterator<Item = &VersionDescriptor> {
        self.versions.iter().filter(|v| v.served)
    }

    /// Get all versions flagged as storage
    pub fn storage_versions(&self) -> impl Iterator<Item = &VersionDescriptor> {
        self.versions.iter().filter(|v| v.storage)
    }

    pub fn version(&self, name: &str) -> Option<&VersionDescriptor> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Full API version for one of this resource's versions
    pub fn api_version(&self, version: &str) -> String {
        format!("{}/{}", self.group, version)
    }

    /// Record a cluster the definition was seen on, ignoring duplicates
    pub fn add_cluster(&mut self, cluster: ClusterRef) {
        if !self.clusters.iter().any(|c| c.name == cluster.name) {
            self.clusters.push(cluster);
        }
    }

    /// Record a composition implementing this resource, ignoring duplicates
    pub fn add_composition(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.compositions.contains(&name) {
            self.compositions.push(name);
        }
    }

    /// Merge a second sighting of the same definition into this one
    pub fn merge(&mut self, other: ResourceDescriptor) {
        for cluster in other.clusters {
            self.add_cluster(cluster);
        }
        for composition in other.compositions {
            self.add_composition(composition);
        }
    }

    /// Name of the first cluster, used for entity provenance
    pub fn origin_cluster(&self) -> Option<&ClusterRef> {
        self.clusters.first()
    }
}

/// Label selector (only equality matching)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// All selector pairs must be present on the labels
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            DescriptorKind::Crd,
            "certificates.cert-manager.io",
            "cert-manager.io",
            ResourceNames::new("Certificate", "certificates"),
        )
    }

    #[test]
    fn test_served_and_storage_versions() {
        let mut d = descriptor();
        let mut v1 = VersionDescriptor::new("v1");
        v1.storage = true;
        let mut v1beta1 = VersionDescriptor::new("v1beta1");
        v1beta1.served = false;
        d.versions = vec![v1beta1, v1];

        let served: Vec<_> = d.served_versions().map(|v| v.name.as_str()).collect();
        assert_eq!(served, vec!["v1"]);
        assert_eq!(d.storage_versions().count(), 1);
        assert_eq!(d.api_version("v1"), "cert-manager.io/v1");
    }

    #[test]
    fn test_merge_keeps_discovery_order() {
        let mut first = descriptor();
        first.add_cluster(ClusterRef::new("prod"));
        let mut second = descriptor();
        second.add_cluster(ClusterRef::new("staging"));
        second.add_cluster(ClusterRef::new("prod"));

        first.merge(second);

        let names: Vec<_> = first.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["prod", "staging"]);
    }

    #[test]
    fn test_lenient_scope_parse() {
        assert_eq!(ResourceScope::parse_lenient("Namespaced"), ResourceScope::Namespaced);
        assert_eq!(
            ResourceScope::parse_lenient("LegacyCluster"),
            ResourceScope::LegacyCluster
        );
        assert_eq!(ResourceScope::parse_lenient("Cluster"), ResourceScope::Cluster);
        assert_eq!(ResourceScope::parse_lenient("Sideways"), ResourceScope::Cluster);
    }

    #[test]
    fn test_label_selector() {
        let selector = LabelSelector {
            match_labels: BTreeMap::from([("team".to_string(), "platform".to_string())]),
        };
        let mut labels = BTreeMap::new();
        assert!(!selector.matches(&labels));
        labels.insert("team".to_string(), "platform".to_string());
        labels.insert("tier".to_string(), "gold".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn test_cluster_identifier_falls_back_to_name() {
        assert_eq!(ClusterRef::new("prod").identifier(), "prod");
        assert_eq!(
            ClusterRef::new("prod")
                .with_url("https://prod.example.com")
                .identifier(),
            "https://prod.example.com"
        );
    }
}
