//! Template pipeline steps
//!
//! Step ids are referenced by later steps and by the template output, so they
//! never change. Conditions are emitted as data for the scaffolder; nothing
//! here evaluates them.

use crate::config::GeneratorConfig;
use crate::parameters::{
    ParamNames, BASE_PATH_PARAM, CLUSTERS_PARAM, LAYOUT_CLUSTER_SCOPED, LAYOUT_CUSTOM,
    LAYOUT_NAMESPACE_SCOPED, MANIFEST_LAYOUT_PARAM, OWNER_PARAM, PUSH_TO_GIT_PARAM,
    REPO_URL_PARAM, SELECTION_STRATEGY_PARAM, TARGET_BRANCH_PARAM,
};
use crate::result::TransformWarning;
use catalog_crd::{ResourceDescriptor, VersionDescriptor};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

pub const GENERATE_MANIFEST_STEP: &str = "generateManifest";
pub const MOVE_NAMESPACED_MANIFEST_STEP: &str = "moveNamespacedManifest";
pub const MOVE_CUSTOM_MANIFEST_STEP: &str = "moveCustomManifest";
pub const CREATE_PULL_REQUEST_STEP: &str = "create-pull-request";

pub const CLAIM_TEMPLATE_ACTION: &str = "terasky:claim-template";
pub const XR_TEMPLATE_ACTION: &str = "terasky:xr-template";
pub const CRD_TEMPLATE_ACTION: &str = "terasky:crd-template";
pub const RENAME_ACTION: &str = "fs:rename";

pub const API_VERSION_TOKEN: &str = "{API_VERSION}";
pub const KIND_TOKEN: &str = "{KIND}";

/// Repository the publishing side fills in when no fixed `repo_url` is configured
pub const REPO_URL_TOKEN: &str = "{REPO_URL}";

/// Form-only parameters that never reach a manifest body
const PUBLISH_PARAMS: &[&str] = &[
    OWNER_PARAM,
    PUSH_TO_GIT_PARAM,
    REPO_URL_PARAM,
    TARGET_BRANCH_PARAM,
    MANIFEST_LAYOUT_PARAM,
    BASE_PATH_PARAM,
    CLUSTERS_PARAM,
    "_editData",
];

/// One step of a Template pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    pub name: String,
    pub action: String,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub input: Mapping,
}

impl PipelineStep {
    fn new(id: &str, name: &str, action: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            action: action.to_string(),
            condition: None,
            input: Mapping::new(),
        }
    }

    fn when(mut self, condition: String) -> Self {
        self.condition = Some(condition);
        self
    }

    fn input(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }
}

/// Which manifest-generation branch a descriptor takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestPath {
    /// v2 Cluster/Namespaced XR created directly
    DirectXr,
    /// v1 XRD, or v2 LegacyCluster, created through a claim
    Claim,
    /// Plain CRD
    Crd,
}

impl ManifestPath {
    pub fn of(descriptor: &ResourceDescriptor) -> Self {
        if descriptor.is_crd() {
            Self::Crd
        } else if descriptor.is_direct_xr() {
            Self::DirectXr
        } else {
            Self::Claim
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::DirectXr => XR_TEMPLATE_ACTION,
            Self::Claim => CLAIM_TEMPLATE_ACTION,
            Self::Crd => CRD_TEMPLATE_ACTION,
        }
    }
}

/// Token substitution for step text
pub struct Placeholders<'a> {
    pub api_version: &'a str,
    pub kind: &'a str,
}

impl Placeholders<'_> {
    pub fn substitute(&self, text: &str) -> String {
        text.replace(API_VERSION_TOKEN, self.api_version)
            .replace(KIND_TOKEN, self.kind)
    }

    fn apply(&self, value: &mut Value) {
        match value {
            Value::String(s) => *s = self.substitute(s),
            Value::Sequence(seq) => seq.iter_mut().for_each(|v| self.apply(v)),
            Value::Mapping(map) => map.values_mut().for_each(|v| self.apply(v)),
            _ => {}
        }
    }

    fn apply_step(&self, step: &mut PipelineStep) {
        step.name = self.substitute(&step.name);
        for value in step.input.values_mut() {
            self.apply(value);
        }
    }
}

/// First placeholder token still present in any step input
pub fn unresolved_placeholder(steps: &[PipelineStep]) -> Option<&'static str> {
    fn find(value: &Value) -> Option<&'static str> {
        match value {
            Value::String(s) => [API_VERSION_TOKEN, KIND_TOKEN]
                .into_iter()
                .find(|token| s.contains(token)),
            Value::Sequence(seq) => seq.iter().find_map(find),
            Value::Mapping(map) => map.values().find_map(find),
            _ => None,
        }
    }

    steps
        .iter()
        .flat_map(|step| step.input.values())
        .find_map(find)
}

pub struct StepAssembler<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> StepAssembler<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    /// Ordered steps for one (resource, version) pair
    pub fn assemble(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> Result<Vec<PipelineStep>, TransformWarning> {
        let path = ManifestPath::of(descriptor);
        let params = ParamNames::for_descriptor(descriptor);
        let namespace_param = match path {
            ManifestPath::Claim => Some(params.namespace),
            ManifestPath::DirectXr | ManifestPath::Crd => descriptor
                .include_namespace()
                .then_some(params.namespace),
        };

        let mut steps = vec![
            self.generate_manifest(path, params, namespace_param),
            move_namespaced_manifest(params, namespace_param),
            move_custom_manifest(params),
        ];

        if let Some(pull_request) = self.create_pull_request(params) {
            steps.push(pull_request);
        }

        let api_version = descriptor.api_version(&version.name);
        let placeholders = Placeholders {
            api_version: &api_version,
            kind: descriptor.resource_kind(),
        };
        for step in &mut steps {
            placeholders.apply_step(step);
        }

        match unresolved_placeholder(&steps) {
            Some(token) => Err(TransformWarning::UnresolvedPlaceholder {
                resource: descriptor.name.clone(),
                token: token.to_string(),
            }),
            None => Ok(steps),
        }
    }

    fn generate_manifest(
        &self,
        path: ManifestPath,
        params: ParamNames,
        namespace_param: Option<&str>,
    ) -> PipelineStep {
        let mut excluded = vec![params.name];
        excluded.extend(namespace_param);
        if path != ManifestPath::Crd {
            excluded.push(SELECTION_STRATEGY_PARAM);
        }
        excluded.extend_from_slice(PUBLISH_PARAMS);

        let mut step = PipelineStep::new(
            GENERATE_MANIFEST_STEP,
            "Generate Kubernetes Resource Manifest",
            path.action(),
        )
        .input("parameters", "${{ parameters }}")
        .input("nameParam", params.name);

        if let Some(namespace) = namespace_param {
            step = step.input("namespaceParam", namespace);
        }

        step.input(
            "excludeParams",
            Value::Sequence(excluded.into_iter().map(Value::from).collect()),
        )
        .input("apiVersion", API_VERSION_TOKEN)
        .input("kind", KIND_TOKEN)
        .input(
            "clusters",
            format!(
                "${{{{ parameters.{CLUSTERS_PARAM} if parameters.{MANIFEST_LAYOUT_PARAM} === '{LAYOUT_CLUSTER_SCOPED}' and parameters.{PUSH_TO_GIT_PARAM} else ['temp'] }}}}"
            ),
        )
        .input("removeEmptyParams", true)
    }

    fn create_pull_request(&self, params: ParamNames) -> Option<PipelineStep> {
        let publish = &self.config.publish;
        let action = publish.target.action()?;

        let (repo_url, target_branch) = if publish.allow_repo_selection {
            (
                expression(&format!("parameters.{REPO_URL_PARAM}")),
                expression(&format!("parameters.{TARGET_BRANCH_PARAM}")),
            )
        } else {
            (
                publish
                    .repo_url
                    .clone()
                    .filter(|url| !url.is_empty())
                    .unwrap_or_else(|| REPO_URL_TOKEN.to_string()),
                publish.target_branch.clone(),
            )
        };

        let name = expression(&format!("parameters.{}", params.name));
        let title = format!("Create {KIND_TOKEN} Resource {name}");

        Some(
            PipelineStep::new(CREATE_PULL_REQUEST_STEP, "Create Pull Request", action.action)
                .when(expression(&format!("parameters.{PUSH_TO_GIT_PARAM}")))
                .input("repoUrl", repo_url)
                .input("branchName", format!("create-{name}-resource"))
                .input("title", title.as_str())
                .input("description", title.as_str())
                .input("targetBranchName", target_branch),
        )
    }
}

fn move_namespaced_manifest(params: ParamNames, namespace_param: Option<&str>) -> PipelineStep {
    let name = expression(&format!("parameters.{}", params.name));
    let to = match namespace_param {
        Some(namespace) => format!("./{}/{name}.yaml", expression(&format!("parameters.{namespace}"))),
        None => format!("./{name}.yaml"),
    };

    rename_step(MOVE_NAMESPACED_MANIFEST_STEP, LAYOUT_NAMESPACE_SCOPED, to)
}

fn move_custom_manifest(params: ParamNames) -> PipelineStep {
    let to = format!(
        "./{}/{}.yaml",
        expression(&format!("parameters.{BASE_PATH_PARAM}")),
        expression(&format!("parameters.{}", params.name))
    );

    rename_step(MOVE_CUSTOM_MANIFEST_STEP, LAYOUT_CUSTOM, to)
}

fn rename_step(id: &str, layout: &str, to: String) -> PipelineStep {
    let mut file = Mapping::new();
    file.insert(
        "from".into(),
        expression(&format!("steps.{GENERATE_MANIFEST_STEP}.output.filePaths[0]")).into(),
    );
    file.insert("to".into(), to.into());

    PipelineStep::new(id, "Move and Rename Manifest", RENAME_ACTION)
        .when(expression(&format!(
            "parameters.{MANIFEST_LAYOUT_PARAM} === '{layout}'"
        )))
        .input("files", Value::Sequence(vec![Value::Mapping(file)]))
}

/// Wrap an expression for the scaffolder's template syntax
pub fn expression(body: &str) -> String {
    format!("${{{{ {body} }}}}")
}
