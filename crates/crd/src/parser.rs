//! Descriptor parser implementation
//!
//! Turns raw Kubernetes objects into checked descriptors. Objects that are
//! not definitions or compositions are ignored; definitions missing required
//! fields are rejected with an error naming what is missing.

use crate::schema::SchemaNode;
use crate::types::{
    ClusterRef, DescriptorKind, ResourceDescriptor, ResourceNames, ResourceScope,
    VersionDescriptor,
};
use anyhow::{anyhow, Context, Result};
use glob::Pattern;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const CROSSPLANE_API_GROUP: &str = "apiextensions.crossplane.io/";
const KUBERNETES_API_GROUP: &str = "apiextensions.k8s.io/";

/// A composition implementing some composite resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRef {
    pub name: String,
    /// `spec.compositeTypeRef.apiVersion`
    pub composite_api_version: String,
    /// `spec.compositeTypeRef.kind`
    pub composite_kind: String,
}

impl CompositionRef {
    /// Whether this composition implements the given XRD
    pub fn implements(&self, descriptor: &ResourceDescriptor) -> bool {
        let group = self
            .composite_api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or(&self.composite_api_version);
        group == descriptor.group && self.composite_kind == descriptor.names.kind
    }
}

/// Result of parsing one raw object
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedObject {
    Definition(ResourceDescriptor),
    Composition(CompositionRef),
}

/// A manifest file that was skipped
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Documents read from a directory, plus the files that could not be used
#[derive(Debug, Default)]
pub struct LoadedManifests {
    pub documents: Vec<Value>,
    pub failures: Vec<FileFailure>,
}

/// All `.yaml`/`.yml` files below `dir`, in path order
pub fn find_yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("Not a directory: {:?}", dir));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    Ok(paths)
}

pub struct DescriptorParser;

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorParser {
    pub fn new() -> Self {
        Self
    }

    /// Load every YAML document from a directory tree.
    ///
    /// A file that cannot be read or is not valid YAML is skipped and
    /// reported in `failures`; only an unusable directory is an error.
    pub fn load_directory(&self, dir_path: &Path) -> Result<LoadedManifests> {
        info!("Loading manifests from directory: {:?}", dir_path);

        let mut loaded = LoadedManifests::default();

        for path in find_yaml_files(dir_path)? {
            let parsed = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))
                .and_then(|content| {
                    self.split_documents(&content)
                        .with_context(|| format!("parsing {} as YAML", path.display()))
                });

            match parsed {
                Ok(docs) => loaded.documents.extend(docs),
                Err(error) => {
                    debug!("Skipping {}: {:#}", path.display(), error);
                    loaded.failures.push(FileFailure { path, error });
                }
            }
        }

        info!(
            "Loaded {} documents ({} files skipped)",
            loaded.documents.len(),
            loaded.failures.len()
        );
        Ok(loaded)
    }

    /// Split a multi-document YAML stream, skipping empty documents
    pub fn split_documents(&self, content: &str) -> Result<Vec<Value>> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = Value::deserialize(document)?;
            if !value.is_null() {
                documents.push(value);
            }
        }
        Ok(documents)
    }

    /// Parse one raw object discovered on `cluster`
    pub fn parse_document(&self, doc: &Value, cluster: &ClusterRef) -> Result<Option<ParsedObject>> {
        let api_version = doc.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
        let kind = doc.get("kind").and_then(|k| k.as_str()).unwrap_or("");

        match kind {
            "CompositeResourceDefinition" if api_version.starts_with(CROSSPLANE_API_GROUP) => self
                .parse_definition(doc, DescriptorKind::Xrd, cluster)
                .map(|d| Some(ParsedObject::Definition(d))),
            "CustomResourceDefinition" if api_version.starts_with(KUBERNETES_API_GROUP) => self
                .parse_definition(doc, DescriptorKind::Crd, cluster)
                .map(|d| Some(ParsedObject::Definition(d))),
            "Composition" if api_version.starts_with(CROSSPLANE_API_GROUP) => self
                .parse_composition(doc)
                .map(|c| Some(ParsedObject::Composition(c))),
            _ => Ok(None),
        }
    }

    /// Extract a definition from an XRD or CRD object
    fn parse_definition(
        &self,
        doc: &Value,
        kind: DescriptorKind,
        cluster: &ClusterRef,
    ) -> Result<ResourceDescriptor> {
        let metadata = doc
            .get("metadata")
            .ok_or_else(|| anyhow!("{kind} missing metadata"))?;

        let name = metadata
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow!("{kind} missing name"))?;

        let spec = doc
            .get("spec")
            .ok_or_else(|| anyhow!("{kind} {name} missing spec"))?;

        let group = spec
            .get("group")
            .and_then(|g| g.as_str())
            .ok_or_else(|| anyhow!("{kind} {name} missing group"))?;

        let names = parse_names(spec.get("names"))
            .ok_or_else(|| anyhow!("{kind} {name} missing names.kind or names.plural"))?;

        let versions = spec
            .get("versions")
            .and_then(|v| v.as_sequence())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("{kind} {name} has no versions"))?;

        let mut descriptor = ResourceDescriptor::new(kind, name, group, names);
        descriptor.claim_names = parse_names(spec.get("claimNames"));
        descriptor.declared_scope = spec
            .get("scope")
            .and_then(|s| s.as_str())
            .map(ResourceScope::parse_lenient);
        descriptor.default_composition = spec
            .get("defaultCompositionRef")
            .and_then(|r| r.get("name"))
            .and_then(|n| n.as_str())
            .map(str::to_string);
        descriptor.labels = parse_labels(metadata.get("labels"));
        descriptor.add_cluster(cluster.clone());

        for version_doc in versions {
            descriptor
                .versions
                .push(self.parse_version(version_doc, kind, name)?);
        }

        debug!(
            "Parsed {} {} with {} versions",
            kind,
            name,
            descriptor.versions.len()
        );

        Ok(descriptor)
    }

    fn parse_version(
        &self,
        version_doc: &Value,
        kind: DescriptorKind,
        name: &str,
    ) -> Result<VersionDescriptor> {
        let version_name = version_doc
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow!("{kind} {name} version missing name"))?;

        let flag = |key: &str| version_doc.get(key).and_then(|v| v.as_bool());

        let schema = match version_doc
            .get("schema")
            .and_then(|s| s.get("openAPIV3Schema"))
        {
            Some(raw) => Some(
                SchemaNode::from_value(raw)
                    .with_context(|| format!("{kind} {name} version {version_name} schema"))?,
            ),
            None => None,
        };

        Ok(VersionDescriptor {
            name: version_name.to_string(),
            served: flag("served").unwrap_or(false),
            // XRDs mark their canonical version as referenceable rather than storage
            storage: flag("storage").or_else(|| flag("referenceable")).unwrap_or(false),
            schema,
            generated_schema: None,
        })
    }

    fn parse_composition(&self, doc: &Value) -> Result<CompositionRef> {
        let name = doc
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow!("Composition missing name"))?;

        let type_ref = doc
            .get("spec")
            .and_then(|s| s.get("compositeTypeRef"))
            .ok_or_else(|| anyhow!("Composition {name} missing compositeTypeRef"))?;

        let field = |key: &str| {
            type_ref
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Composition {name} compositeTypeRef missing {key}"))
        };

        Ok(CompositionRef {
            name: name.to_string(),
            composite_api_version: field("apiVersion")?,
            composite_kind: field("kind")?,
        })
    }
}

fn parse_names(names: Option<&Value>) -> Option<ResourceNames> {
    let names = names?;
    let kind = names.get("kind")?.as_str()?;
    let plural = names.get("plural")?.as_str()?;
    Some(ResourceNames::new(kind, plural))
}

fn parse_labels(labels: Option<&Value>) -> BTreeMap<String, String> {
    labels
        .and_then(|l| l.as_mapping())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Check a name against glob patterns; an empty list matches everything
pub fn matches_filters(name: &str, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }

    filters.iter().any(|filter| matches_filter(name, filter))
}

/// Check a name against one glob pattern
pub fn matches_filter(name: &str, filter: &str) -> bool {
    match Pattern::new(filter) {
        Ok(pattern) => pattern.matches(name),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRD_V1: &str = r#"
apiVersion: apiextensions.crossplane.io/v1
kind: CompositeResourceDefinition
metadata:
  name: xdatabases.example.org
  labels:
    team: data
spec:
  group: example.org
  names:
    kind: XDatabase
    plural: xdatabases
  claimNames:
    kind: Database
    plural: databases
  defaultCompositionRef:
    name: database-aws
  versions:
    - name: v1alpha1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                size:
                  type: integer
"#;

    fn parse(yaml: &str) -> Result<Option<ParsedObject>> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        DescriptorParser::new().parse_document(&doc, &ClusterRef::new("prod"))
    }

    fn definition(yaml: &str) -> ResourceDescriptor {
        match parse(yaml).unwrap() {
            Some(ParsedObject::Definition(d)) => d,
            other => panic!("expected a definition, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_v1_xrd() {
        let d = definition(XRD_V1);
        assert_eq!(d.kind, DescriptorKind::Xrd);
        assert_eq!(d.name, "xdatabases.example.org");
        assert_eq!(d.group, "example.org");
        assert_eq!(d.claim_names, Some(ResourceNames::new("Database", "databases")));
        assert_eq!(d.declared_scope, None);
        assert_eq!(d.default_composition.as_deref(), Some("database-aws"));
        assert_eq!(d.labels.get("team").map(String::as_str), Some("data"));
        assert_eq!(d.clusters, vec![ClusterRef::new("prod")]);

        let version = &d.versions[0];
        assert!(version.served);
        assert!(version.storage);
        assert!(version.spec_schema().is_some());
    }

    #[test]
    fn test_parse_v2_xrd_scope() {
        let yaml = XRD_V1
            .replace("crossplane.io/v1", "crossplane.io/v2")
            .replace("  group: example.org", "  group: example.org\n  scope: Namespaced");
        let d = definition(&yaml);
        assert_eq!(d.declared_scope, Some(ResourceScope::Namespaced));
        assert!(d.is_v2());
    }

    #[test]
    fn test_parse_crd_without_schema() {
        let d = definition(
            r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Cluster
  names: {kind: Widget, plural: widgets}
  versions:
    - name: v1
      served: true
      storage: true
"#,
        );
        assert_eq!(d.kind, DescriptorKind::Crd);
        assert_eq!(d.declared_scope, Some(ResourceScope::Cluster));
        assert!(d.versions[0].schema.is_none());
    }

    #[test]
    fn test_structural_defects() {
        let missing_spec = "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata: {name: a.b}";
        assert!(parse(missing_spec).is_err());

        let missing_metadata = "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nspec: {}";
        assert!(parse(missing_metadata).is_err());

        let empty_versions = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata: {name: widgets.example.com}
spec:
  group: example.com
  names: {kind: Widget, plural: widgets}
  versions: []
"#;
        let err = parse(empty_versions).unwrap_err();
        assert!(err.to_string().contains("no versions"));
    }

    #[test]
    fn test_ignores_unrelated_objects() {
        assert!(parse("apiVersion: v1\nkind: ConfigMap\nmetadata: {name: x}")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_composition() {
        let parsed = parse(
            r#"
apiVersion: apiextensions.crossplane.io/v1
kind: Composition
metadata: {name: database-aws}
spec:
  compositeTypeRef: {apiVersion: example.org/v1alpha1, kind: XDatabase}
"#,
        )
        .unwrap();

        let composition = match parsed {
            Some(ParsedObject::Composition(c)) => c,
            other => panic!("expected a composition, got {other:?}"),
        };
        assert!(composition.implements(&definition(XRD_V1)));
    }

    #[test]
    fn test_split_documents() {
        let docs = DescriptorParser::new()
            .split_documents("a: 1\n---\n---\nb: 2\n")
            .unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("xrd.yaml"), XRD_V1).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not yaml: [").unwrap();

        let loaded = DescriptorParser::new().load_directory(dir.path()).unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert!(loaded.failures.is_empty());
    }

    #[test]
    fn test_load_directory_skips_unusable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a-broken.yaml"), "kind: [unclosed").unwrap();
        std::fs::write(dir.path().join("b-latin1.yaml"), [0xff, 0xfe, 0x41]).unwrap();
        std::fs::write(dir.path().join("c-xrd.yaml"), XRD_V1).unwrap();

        let loaded = DescriptorParser::new().load_directory(dir.path()).unwrap();
        assert_eq!(loaded.documents.len(), 1);

        let skipped: Vec<_> = loaded.failures.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            skipped,
            vec![dir.path().join("a-broken.yaml"), dir.path().join("b-latin1.yaml")]
        );
    }

    #[test]
    fn test_find_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.yaml"), "a: 1").unwrap();
        std::fs::write(nested.join("a.yml"), "a: 1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = find_yaml_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("b.yaml"), nested.join("a.yml")]);

        assert!(find_yaml_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_filter_matching() {
        // Exact match
        assert!(matches_filter("widgets.example.com", "widgets.example.com"));

        // Wildcard match
        assert!(matches_filter("widgets.example.com", "*.example.com"));

        // No match
        assert!(!matches_filter("widgets.example.com", "*.other.io"));

        assert!(matches_filters("anything", &[]));
    }
}
