//! Catalog entities and their assembly
//!
//! A Template carries the creation form and pipeline for one resource version;
//! an API entity carries the OpenAPI document for one version. Both are built
//! fresh per pass and never mutated afterwards.

use crate::config::GeneratorConfig;
use crate::form::FormField;
use crate::openapi::OpenApiDocAssembler;
use crate::parameters::{ParameterAssembler, PUSH_TO_GIT_PARAM};
use crate::result::TransformWarning;
use crate::steps::{
    expression, PipelineStep, StepAssembler, CREATE_PULL_REQUEST_STEP, GENERATE_MANIFEST_STEP,
};
use catalog_crd::{DescriptorKind, ResourceDescriptor, VersionDescriptor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TEMPLATE_API_VERSION: &str = "scaffolder.backstage.io/v1beta3";
pub const API_API_VERSION: &str = "backstage.io/v1alpha1";
pub const TEMPLATE_KIND: &str = "Template";
pub const API_KIND: &str = "API";

/// Longest entity name the catalog accepts
pub const ENTITY_NAME_MAX_LENGTH: usize = 63;

pub const MANAGED_BY_LOCATION: &str = "backstage.io/managed-by-location";
pub const MANAGED_BY_ORIGIN_LOCATION: &str = "backstage.io/managed-by-origin-location";

/// Either kind of generated entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntity {
    Template(TemplateEntity),
    Api(ApiEntity),
}

impl CatalogEntity {
    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }

    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Template(t) => &t.kind,
            Self::Api(a) => &a.kind,
        }
    }

    pub fn metadata(&self) -> &EntityMetadata {
        match self {
            Self::Template(t) => &t.metadata,
            Self::Api(a) => &a.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata().annotations.get(key).map(String::as_str)
    }

    /// Reject names the catalog would refuse
    pub fn check_name(&self, resource: &str) -> Result<(), TransformWarning> {
        if self.name().len() > ENTITY_NAME_MAX_LENGTH {
            return Err(TransformWarning::NameTooLong {
                entity_kind: self.kind().to_string(),
                name: self.name().to_string(),
                resource: resource.to_string(),
                limit: ENTITY_NAME_MAX_LENGTH,
            });
        }
        if !is_valid_entity_name(self.name()) {
            return Err(TransformWarning::InvalidName {
                entity_kind: self.kind().to_string(),
                name: self.name().to_string(),
                resource: resource.to_string(),
            });
        }
        Ok(())
    }
}

/// Characters allowed anywhere in an entity name
pub fn is_entity_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Catalog name rule: allowed characters only, alphanumeric at both ends
pub fn is_valid_entity_name(name: &str) -> bool {
    let bounded = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    name.chars().all(is_entity_name_char)
        && bounded(name.chars().next())
        && bounded(name.chars().last())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub annotations: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntity {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    pub spec: TemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub owner: String,
    #[serde(rename = "type")]
    pub template_type: String,

    /// Ordered parameter groups, rendered as consecutive form pages
    pub parameters: Vec<FormField>,

    /// Ordered pipeline steps
    pub steps: Vec<PipelineStep>,

    pub output: TemplateOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    pub links: Vec<OutputLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLink {
    pub title: String,
    pub icon: String,
    pub url: String,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntity {
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMetadata,
    pub spec: ApiSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(rename = "type")]
    pub api_type: String,
    pub lifecycle: String,
    pub owner: String,

    /// OpenAPI document rendered as YAML text
    pub definition: String,
}

pub struct EntityAssembler<'a> {
    config: &'a GeneratorConfig,
    parameters: ParameterAssembler<'a>,
    steps: StepAssembler<'a>,
    openapi: OpenApiDocAssembler,
}

impl<'a> EntityAssembler<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            parameters: ParameterAssembler::new(config),
            steps: StepAssembler::new(config),
            openapi: OpenApiDocAssembler::new(),
        }
    }

    pub fn template_name(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> String {
        format!("{}{}-{}", self.config.name_prefix, descriptor.name, version.name)
    }

    pub fn api_name(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> String {
        format!(
            "{}{}-{}--{}",
            self.config.name_prefix,
            descriptor.resource_kind().to_lowercase(),
            descriptor.group,
            version.name
        )
    }

    /// Template entity for one served version
    pub fn template(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> Result<CatalogEntity, TransformWarning> {
        debug!("Assembling template for {} {}", descriptor.name, version.name);
        let steps = self.steps.assemble(descriptor, version)?;
        let kind = descriptor.resource_kind();

        let metadata = EntityMetadata {
            name: self.template_name(descriptor, version),
            title: format!("{kind} ({})", version.name),
            description: format!(
                "Create a {kind} resource ({})",
                descriptor.api_version(&version.name)
            ),
            tags: tags(descriptor),
            labels: labels(descriptor),
            annotations: self.annotations(descriptor, version),
        };

        Ok(CatalogEntity::Template(TemplateEntity {
            api_version: TEMPLATE_API_VERSION.to_string(),
            kind: TEMPLATE_KIND.to_string(),
            metadata,
            spec: TemplateSpec {
                owner: self.config.owner.clone(),
                template_type: template_type(descriptor).to_string(),
                parameters: self.parameters.assemble(descriptor, version),
                steps,
                output: self.output(),
            },
        }))
    }

    /// API entity for one served version
    pub fn api(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> Result<CatalogEntity, TransformWarning> {
        debug!("Assembling API for {} {}", descriptor.name, version.name);
        let document = self.openapi.assemble(descriptor, version);
        let definition =
            serde_yaml::to_string(&document).map_err(|e| TransformWarning::StructuralDefect {
                resource: descriptor.name.clone(),
                reason: format!("OpenAPI document for {} could not be rendered: {e}", version.name),
            })?;

        let kind = descriptor.resource_kind();
        let metadata = EntityMetadata {
            name: self.api_name(descriptor, version),
            title: format!("{kind} API ({})", version.name),
            description: format!(
                "API for {kind} resources ({})",
                descriptor.api_version(&version.name)
            ),
            tags: tags(descriptor),
            labels: labels(descriptor),
            annotations: self.annotations(descriptor, version),
        };

        Ok(CatalogEntity::Api(ApiEntity {
            api_version: API_API_VERSION.to_string(),
            kind: API_KIND.to_string(),
            metadata,
            spec: ApiSpec {
                api_type: "openapi".to_string(),
                lifecycle: "production".to_string(),
                owner: self.config.owner.clone(),
                definition,
            },
        }))
    }

    /// Classification snapshot so consumers need not re-derive it
    pub fn annotations(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> IndexMap<String, String> {
        let classification = descriptor.classify();
        let prefix = &self.config.annotation_prefix;
        let origin = format!(
            "cluster origin: {}",
            descriptor
                .origin_cluster()
                .map(|c| c.name.as_str())
                .unwrap_or_default()
        );

        let mut annotations = IndexMap::new();
        annotations.insert(MANAGED_BY_LOCATION.to_string(), origin.clone());
        annotations.insert(MANAGED_BY_ORIGIN_LOCATION.to_string(), origin);

        let mut put = |key: &str, value: String| {
            annotations.insert(format!("{prefix}/{key}"), value);
        };
        put("source-kind", descriptor.kind.to_string());
        if descriptor.is_xrd() {
            put("crossplane-version", classification.crossplane_version().to_string());
        }
        put("resource-scope", classification.scope.as_str().to_string());
        put("uses-claims", classification.uses_claims.to_string());
        put("direct-xr", classification.is_direct_xr.to_string());
        put("include-namespace", classification.include_namespace.to_string());
        put("resource-kind", descriptor.resource_kind().to_string());
        put("resource-api-version", descriptor.api_version(&version.name));

        annotations
    }

    fn output(&self) -> TemplateOutput {
        let mut links = vec![OutputLink {
            title: "Download YAML Manifest".to_string(),
            icon: "download".to_string(),
            url: format!(
                "data:application/yaml;charset=utf-8,{}",
                expression(&format!("steps.{GENERATE_MANIFEST_STEP}.output.manifest"))
            ),
            condition: None,
        }];

        if let Some(action) = self.config.publish.target.action() {
            links.push(OutputLink {
                title: "Open Pull Request".to_string(),
                icon: "web".to_string(),
                url: expression(&format!(
                    "steps[\"{CREATE_PULL_REQUEST_STEP}\"].output.{}",
                    action.link_field
                )),
                condition: Some(expression(&format!("parameters.{PUSH_TO_GIT_PARAM}"))),
            });
        }

        TemplateOutput { links }
    }
}

fn source_label(descriptor: &ResourceDescriptor) -> &'static str {
    match descriptor.kind {
        DescriptorKind::Xrd => "crossplane",
        DescriptorKind::Crd => "kubernetes",
    }
}

fn template_type(descriptor: &ResourceDescriptor) -> &'static str {
    match descriptor.kind {
        DescriptorKind::Xrd => "crossplane-resource",
        DescriptorKind::Crd => "kubernetes-resource",
    }
}

fn tags(descriptor: &ResourceDescriptor) -> Vec<String> {
    vec![
        source_label(descriptor).to_string(),
        descriptor.resource_kind().to_lowercase(),
    ]
}

fn labels(descriptor: &ResourceDescriptor) -> IndexMap<String, String> {
    IndexMap::from([
        ("forEntity".to_string(), "system".to_string()),
        ("source".to_string(), source_label(descriptor).to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishTarget;
    use catalog_crd::{ClusterRef, ResourceNames, ResourceScope};

    fn xrd() -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(
            DescriptorKind::Xrd,
            "xdatabases.example.org",
            "example.org",
            ResourceNames::new("XDatabase", "xdatabases"),
        );
        d.claim_names = Some(ResourceNames::new("Database", "databases"));
        d.versions.push(VersionDescriptor::new("v1alpha1"));
        d.add_cluster(ClusterRef::new("prod"));
        d.add_cluster(ClusterRef::new("dev"));
        d
    }

    fn crd() -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(
            DescriptorKind::Crd,
            "widgets.example.com",
            "example.com",
            ResourceNames::new("Widget", "widgets"),
        );
        d.declared_scope = Some(ResourceScope::Cluster);
        d.add_cluster(ClusterRef::new("prod"));
        d
    }

    #[test]
    fn test_names() {
        let mut config = GeneratorConfig::default();
        config.name_prefix = "team-".to_string();
        let assembler = EntityAssembler::new(&config);
        let version = VersionDescriptor::new("v1alpha1");

        assert_eq!(
            assembler.template_name(&xrd(), &version),
            "team-xdatabases.example.org-v1alpha1"
        );
        assert_eq!(
            assembler.api_name(&xrd(), &version),
            "team-database-example.org--v1alpha1"
        );
    }

    #[test]
    fn test_template_shape() {
        let config = GeneratorConfig::default();
        let assembler = EntityAssembler::new(&config);
        let entity = assembler
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();

        let CatalogEntity::Template(template) = &entity else {
            panic!("expected a template");
        };
        assert_eq!(template.api_version, TEMPLATE_API_VERSION);
        assert_eq!(template.kind, TEMPLATE_KIND);
        assert_eq!(template.spec.owner, "kubernetes-auto-ingested");
        assert_eq!(template.spec.steps[0].id, GENERATE_MANIFEST_STEP);

        let links = &template.spec.output.links;
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].url,
            "data:application/yaml;charset=utf-8,${{ steps.generateManifest.output.manifest }}"
        );
        assert!(links[0].condition.is_none());
        assert_eq!(
            links[1].url,
            "${{ steps[\"create-pull-request\"].output.remoteUrl }}"
        );
        assert_eq!(links[1].condition.as_deref(), Some("${{ parameters.pushToGit }}"));
    }

    #[test]
    fn test_yaml_target_has_single_link() {
        let mut config = GeneratorConfig::default();
        config.publish.target = PublishTarget::Yaml;
        let entity = EntityAssembler::new(&config)
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();
        let CatalogEntity::Template(template) = entity else {
            panic!("expected a template");
        };
        assert_eq!(template.spec.output.links.len(), 1);
    }

    #[test]
    fn test_pull_request_link_field_follows_target() {
        let mut config = GeneratorConfig::default();
        config.publish.target = PublishTarget::BitbucketCloud;
        let entity = EntityAssembler::new(&config)
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();
        let CatalogEntity::Template(template) = entity else {
            panic!("expected a template");
        };
        assert!(template.spec.output.links[1].url.ends_with(".output.pullRequestUrl }}"));
    }

    #[test]
    fn test_xrd_annotations() {
        let config = GeneratorConfig::default();
        let entity = EntityAssembler::new(&config)
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();

        assert_eq!(entity.annotation(MANAGED_BY_LOCATION), Some("cluster origin: prod"));
        assert_eq!(entity.annotation("terasky.backstage.io/crossplane-version"), Some("v1"));
        assert_eq!(entity.annotation("terasky.backstage.io/resource-scope"), Some("Cluster"));
        assert_eq!(entity.annotation("terasky.backstage.io/uses-claims"), Some("true"));
        assert_eq!(entity.annotation("terasky.backstage.io/direct-xr"), Some("false"));
        assert_eq!(entity.annotation("terasky.backstage.io/include-namespace"), Some("true"));
        assert_eq!(entity.annotation("terasky.backstage.io/resource-kind"), Some("Database"));
        assert_eq!(
            entity.annotation("terasky.backstage.io/resource-api-version"),
            Some("example.org/v1alpha1")
        );
    }

    #[test]
    fn test_crd_annotations_and_prefix() {
        let mut config = GeneratorConfig::default();
        config.annotation_prefix = "acme.io".to_string();
        let entity = EntityAssembler::new(&config)
            .api(&crd(), &VersionDescriptor::new("v1"))
            .unwrap();

        assert_eq!(entity.annotation("acme.io/source-kind"), Some("crd"));
        assert_eq!(entity.annotation("acme.io/crossplane-version"), None);
        assert_eq!(entity.annotation("acme.io/include-namespace"), Some("false"));
        assert_eq!(entity.metadata().labels["source"], "kubernetes");
    }

    #[test]
    fn test_api_definition_is_block_text() {
        let config = GeneratorConfig::default();
        let entity = EntityAssembler::new(&config)
            .api(&crd(), &VersionDescriptor::new("v1"))
            .unwrap();

        let CatalogEntity::Api(api) = &entity else {
            panic!("expected an API entity");
        };
        assert_eq!(api.api_version, API_API_VERSION);
        assert_eq!(api.spec.api_type, "openapi");
        assert_eq!(api.spec.lifecycle, "production");
        assert!(api.spec.definition.contains("openapi: 3.0.0"));
        assert!(api.spec.definition.contains("/apis/example.com/v1/widgets/{name}"));

        let rendered = serde_yaml::to_string(&entity).unwrap();
        let reparsed: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(
            reparsed["spec"]["definition"].as_str(),
            Some(api.spec.definition.as_str())
        );
    }

    #[test]
    fn test_check_name() {
        let mut config = GeneratorConfig::default();
        config.name_prefix = "a-very-long-organisation-prefix-for-catalog-".to_string();
        let entity = EntityAssembler::new(&config)
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();

        match entity.check_name("xdatabases.example.org") {
            Err(TransformWarning::NameTooLong { entity_kind, limit, resource, .. }) => {
                assert_eq!(entity_kind, TEMPLATE_KIND);
                assert_eq!(limit, ENTITY_NAME_MAX_LENGTH);
                assert_eq!(resource, "xdatabases.example.org");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let short = EntityAssembler::new(&GeneratorConfig::default())
            .template(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();
        assert!(short.check_name("xdatabases.example.org").is_ok());
    }

    #[test]
    fn test_check_name_rejects_unsafe_characters() {
        let mut config = GeneratorConfig::default();
        config.name_prefix = "team a/".to_string();
        let entity = EntityAssembler::new(&config)
            .api(&xrd(), &VersionDescriptor::new("v1alpha1"))
            .unwrap();

        assert!(matches!(
            entity.check_name("xdatabases.example.org"),
            Err(TransformWarning::InvalidName { entity_kind, .. }) if entity_kind == API_KIND
        ));
    }

    #[test]
    fn test_entity_name_rule() {
        assert!(is_valid_entity_name("xdatabases.example.org-v1alpha1"));
        assert!(is_valid_entity_name("team_a-database-example.org--v1"));
        assert!(!is_valid_entity_name(""));
        assert!(!is_valid_entity_name("-database"));
        assert!(!is_valid_entity_name("database-"));
        assert!(!is_valid_entity_name("data base"));
        assert!(!is_valid_entity_name("datenbank-\u{e4}"));
    }
}
