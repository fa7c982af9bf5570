//! Template parameter groups
//!
//! Groups always come out in the same order: resource metadata, resource
//! spec, Crossplane settings, creation settings. Empty or inapplicable groups
//! are left out without disturbing the others.

use crate::config::GeneratorConfig;
use crate::form::FormField;
use crate::walker::SchemaWalker;
use catalog_crd::{ResourceDescriptor, VersionDescriptor};
use serde_yaml::{Mapping, Value};

pub const DNS_LABEL_PATTERN: &str = "^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
pub const DNS_LABEL_MAX_LENGTH: u64 = 63;

pub const OWNER_PARAM: &str = "owner";
pub const PUSH_TO_GIT_PARAM: &str = "pushToGit";
pub const REPO_URL_PARAM: &str = "repoUrl";
pub const TARGET_BRANCH_PARAM: &str = "targetBranch";
pub const MANIFEST_LAYOUT_PARAM: &str = "manifestLayout";
pub const CLUSTERS_PARAM: &str = "clusters";
pub const BASE_PATH_PARAM: &str = "basePath";
pub const SELECTION_STRATEGY_PARAM: &str = "compositionSelectionStrategy";

pub const LAYOUT_CLUSTER_SCOPED: &str = "cluster-scoped";
pub const LAYOUT_NAMESPACE_SCOPED: &str = "namespace-scoped";
pub const LAYOUT_CUSTOM: &str = "custom";

pub const STRATEGY_RUNTIME: &str = "runtime";
pub const STRATEGY_DIRECT_REFERENCE: &str = "direct-reference";
pub const STRATEGY_LABEL_SELECTOR: &str = "label-selector";

/// Names of the identity parameters for a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamNames {
    pub name: &'static str,
    pub namespace: &'static str,
}

impl ParamNames {
    pub const XR: ParamNames = ParamNames {
        name: "xrName",
        namespace: "xrNamespace",
    };

    pub const CRD: ParamNames = ParamNames {
        name: "name",
        namespace: "namespace",
    };

    pub fn for_descriptor(descriptor: &ResourceDescriptor) -> Self {
        if descriptor.is_xrd() {
            Self::XR
        } else {
            Self::CRD
        }
    }
}

pub struct ParameterAssembler<'a> {
    config: &'a GeneratorConfig,
    walker: SchemaWalker,
}

impl<'a> ParameterAssembler<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            walker: SchemaWalker::new(config.convert_defaults_to_placeholders),
        }
    }

    /// Ordered parameter groups for one (resource, version) pair
    pub fn assemble(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> Vec<FormField> {
        let mut groups = vec![self.metadata_group(descriptor)];

        let spec = self.spec_group(version);
        if spec.has_properties() {
            groups.push(spec);
        }

        if descriptor.is_xrd() {
            groups.push(self.crossplane_group(descriptor));
        }

        if self.config.publish.target.publishes() {
            groups.push(self.publish_group(descriptor));
        }

        groups
    }

    /// Name, namespace (when the scope has one), and owner
    pub fn metadata_group(&self, descriptor: &ResourceDescriptor) -> FormField {
        let params = ParamNames::for_descriptor(descriptor);

        let mut group = FormField::group("Resource Metadata")
            .with_property(
                params.name,
                dns_label_field("Name", "The name of the resource"),
            )
            .with_required(params.name);

        if descriptor.include_namespace() {
            group = group
                .with_property(
                    params.namespace,
                    dns_label_field("Namespace", "The namespace in which to create the resource"),
                )
                .with_required(params.namespace);
        }

        let mut owner = FormField::typed("string")
            .title("Owner")
            .description("The owner of the resource");
        owner.ui_field = Some("OwnerPicker".to_string());
        owner.ui_options = Some(mapping([(
            "catalogFilter",
            mapping([("kind", Value::from("Group"))]),
        )]));

        group.with_property(OWNER_PARAM, owner)
    }

    /// Parameters derived from the version's `spec` schema
    pub fn spec_group(&self, version: &VersionDescriptor) -> FormField {
        let walked = self.walker.walk_node(version.spec_schema());

        FormField {
            title: Some("Resource Spec".to_string()),
            field_type: Some("object".to_string()),
            ..walked
        }
    }

    /// Composition selection; full for claims, a bare strategy toggle for direct XRs
    pub fn crossplane_group(&self, descriptor: &ResourceDescriptor) -> FormField {
        let group = FormField::group("Crossplane Settings");

        if descriptor.is_direct_xr() {
            let mut strategies = vec![STRATEGY_RUNTIME];
            if !descriptor.compositions.is_empty() {
                strategies.push(STRATEGY_DIRECT_REFERENCE);
            }
            strategies.push(STRATEGY_LABEL_SELECTOR);

            return group.with_property(
                SELECTION_STRATEGY_PARAM,
                strategy_field(strategies, STRATEGY_RUNTIME),
            );
        }

        let default_strategy = if descriptor.default_composition.is_some() {
            STRATEGY_DIRECT_REFERENCE
        } else {
            STRATEGY_RUNTIME
        };

        let strategy = strategy_field(
            vec![
                STRATEGY_RUNTIME,
                STRATEGY_DIRECT_REFERENCE,
                STRATEGY_LABEL_SELECTOR,
            ],
            default_strategy,
        );

        let connection_secret = FormField::typed("object")
            .title("Connection Secret")
            .with_property(
                "name",
                FormField::typed("string").title("Connection Secret Name"),
            );

        let mut composition_name = FormField::typed("string").title("Select A Composition By Name");
        if !descriptor.compositions.is_empty() {
            composition_name =
                composition_name.one_of_values(descriptor.compositions.iter().map(String::as_str));
        }
        if let Some(default) = &descriptor.default_composition {
            composition_name = composition_name.default_value(default.as_str());
        }

        let direct_reference = strategy_branch(STRATEGY_DIRECT_REFERENCE)
            .with_property(
                "compositionRef",
                FormField::typed("object")
                    .title("Composition Reference")
                    .with_property("name", composition_name)
                    .with_required("name"),
            )
            .with_required("compositionRef");

        let match_labels = FormField::typed("object")
            .title("Match Labels")
            .with_extra("additionalProperties", mapping([("type", Value::from("string"))]));

        let label_selector = strategy_branch(STRATEGY_LABEL_SELECTOR)
            .with_property(
                "compositionSelector",
                FormField::typed("object")
                    .title("Composition Selector")
                    .with_property("matchLabels", match_labels)
                    .with_required("matchLabels"),
            )
            .with_required("compositionSelector");

        group
            .with_property(SELECTION_STRATEGY_PARAM, strategy)
            .with_property("writeConnectionSecretToRef", connection_secret)
            .with_dependency(
                SELECTION_STRATEGY_PARAM,
                one_of(vec![
                    strategy_branch(STRATEGY_RUNTIME),
                    direct_reference,
                    label_selector,
                ]),
            )
    }

    /// GitOps publication settings
    pub fn publish_group(&self, descriptor: &ResourceDescriptor) -> FormField {
        let publish = &self.config.publish;

        let push_to_git = FormField::typed("boolean")
            .title("Push Manifest to GitOps Repository")
            .default_value(true);

        let mut push_branch = FormField::branch().with_property(
            PUSH_TO_GIT_PARAM,
            FormField::default().one_of_values([true]),
        );

        if publish.allow_repo_selection {
            let mut repo_url = FormField::typed("string")
                .title("Repository Location")
                .description("The repository the manifest is pushed to");
            repo_url.ui_field = Some("RepoUrlPicker".to_string());
            repo_url.ui_options = Some(mapping([(
                "allowedHosts",
                Value::Sequence(
                    publish
                        .allowed_hosts
                        .iter()
                        .map(|h| Value::from(h.as_str()))
                        .collect(),
                ),
            )]));

            push_branch = push_branch
                .with_property(REPO_URL_PARAM, repo_url)
                .with_property(
                    TARGET_BRANCH_PARAM,
                    FormField::typed("string")
                        .title("Target Branch")
                        .description("The branch the pull request targets")
                        .default_value(publish.target_branch.as_str()),
                )
                .with_required(REPO_URL_PARAM)
                .with_required(TARGET_BRANCH_PARAM);
        }

        let layout = FormField::typed("string")
            .title("Manifest File Layout")
            .description("Where the manifest is placed in the repository")
            .one_of_values([LAYOUT_CLUSTER_SCOPED, LAYOUT_NAMESPACE_SCOPED, LAYOUT_CUSTOM])
            .default_value(LAYOUT_CLUSTER_SCOPED);

        push_branch = push_branch
            .with_property(MANIFEST_LAYOUT_PARAM, layout)
            .with_required(MANIFEST_LAYOUT_PARAM)
            .with_dependency(MANIFEST_LAYOUT_PARAM, self.layout_dependencies(descriptor));

        FormField::group("Creation Settings")
            .with_property(PUSH_TO_GIT_PARAM, push_to_git)
            .with_dependency(
                PUSH_TO_GIT_PARAM,
                one_of(vec![
                    FormField::branch().with_property(
                        PUSH_TO_GIT_PARAM,
                        FormField::default().one_of_values([false]),
                    ),
                    push_branch,
                ]),
            )
    }

    fn layout_dependencies(&self, descriptor: &ResourceDescriptor) -> FormField {
        let mut cluster_item = FormField::typed("string");
        if !descriptor.clusters.is_empty() {
            cluster_item =
                cluster_item.one_of_values(descriptor.clusters.iter().map(|c| c.name.as_str()));
        }

        let mut clusters = FormField::typed("array").title("Target Clusters");
        clusters.description = Some("The clusters to apply the resource to".to_string());
        clusters.min_items = Some(1);
        clusters.unique_items = Some(true);
        clusters.items = Some(Box::new(cluster_item));
        clusters.ui_widget = Some("checkboxes".to_string());

        one_of(vec![
            layout_branch(LAYOUT_CLUSTER_SCOPED)
                .with_property(CLUSTERS_PARAM, clusters)
                .with_required(CLUSTERS_PARAM),
            layout_branch(LAYOUT_CUSTOM)
                .with_property(
                    BASE_PATH_PARAM,
                    FormField::typed("string")
                        .title("Base Path")
                        .description("Repository path the manifest is placed under"),
                )
                .with_required(BASE_PATH_PARAM),
            layout_branch(LAYOUT_NAMESPACE_SCOPED),
        ])
    }
}

fn dns_label_field(title: &str, description: &str) -> FormField {
    let mut field = FormField::typed("string").title(title).description(description);
    field.pattern = Some(DNS_LABEL_PATTERN.to_string());
    field.max_length = Some(DNS_LABEL_MAX_LENGTH);
    field
}

fn strategy_field(strategies: Vec<&str>, default: &str) -> FormField {
    FormField::typed("string")
        .title("Composition Selection Strategy")
        .description("How the composition implementing this resource is selected")
        .one_of_values(strategies)
        .default_value(default)
}

fn strategy_branch(strategy: &str) -> FormField {
    FormField::branch().with_property(
        SELECTION_STRATEGY_PARAM,
        FormField::default().one_of_values([strategy]),
    )
}

fn layout_branch(layout: &str) -> FormField {
    FormField::branch().with_property(
        MANIFEST_LAYOUT_PARAM,
        FormField::default().one_of_values([layout]),
    )
}

fn one_of(branches: Vec<FormField>) -> FormField {
    FormField {
        one_of: Some(branches),
        ..Default::default()
    }
}

fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
    let map: Mapping = entries
        .into_iter()
        .map(|(k, v)| (Value::from(k), v))
        .collect();
    Value::Mapping(map)
}
