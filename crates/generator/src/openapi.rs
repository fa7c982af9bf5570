//! OpenAPI 3.0 documents for generated API entities
//!
//! One document per (resource, version). Paths follow the Kubernetes REST
//! layout for the resource's scope; operation ids are derived from the kind
//! and plural only, so they stay stable across runs.

use catalog_crd::{ResourceDescriptor, VersionDescriptor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

pub const OPENAPI_VERSION: &str = "3.0.0";
pub const RESOURCE_SCHEMA: &str = "Resource";
pub const RESOURCE_LIST_SCHEMA: &str = "ResourceList";
pub const BEARER_AUTH: &str = "bearerAuth";

/// OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,

    /// API information
    pub info: ApiInfo,

    /// One server per cluster the resource was discovered on
    pub servers: Vec<Server>,

    /// Paths/endpoints
    pub paths: IndexMap<String, PathItem>,

    pub components: Components,

    /// Security requirements applied to every operation
    pub security: Vec<IndexMap<String, Vec<String>>>,
}

/// API information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Path item (endpoint)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation on the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

/// API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
}

/// Path parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

/// Request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

/// Media type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Value,
}

/// Response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// Components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    pub schemas: IndexMap<String, Value>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// Security scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub scheme: String,
    pub bearer_format: String,
}

impl SecurityScheme {
    pub fn bearer_jwt() -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: "bearer".to_string(),
            bearer_format: "JWT".to_string(),
        }
    }
}

pub struct OpenApiDocAssembler;

impl Default for OpenApiDocAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiDocAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build the document for one version of a resource
    pub fn assemble(
        &self,
        descriptor: &ResourceDescriptor,
        version: &VersionDescriptor,
    ) -> OpenApiDocument {
        let kind = descriptor.resource_kind();
        let plural = descriptor.resource_plural();
        let api_version = descriptor.api_version(&version.name);

        let servers = descriptor
            .clusters
            .iter()
            .map(|cluster| Server {
                url: cluster.identifier().to_string(),
                description: Some(cluster.name.clone()),
            })
            .collect();

        let paths = if descriptor.include_namespace() {
            namespaced_paths(&api_version, kind, plural)
        } else {
            cluster_paths(&api_version, kind, plural)
        };

        let mut schemas = IndexMap::new();
        schemas.insert(
            RESOURCE_SCHEMA.to_string(),
            resource_schema(version, &api_version, kind),
        );
        schemas.insert(RESOURCE_LIST_SCHEMA.to_string(), resource_list_schema());

        let mut security_schemes = IndexMap::new();
        security_schemes.insert(BEARER_AUTH.to_string(), SecurityScheme::bearer_jwt());

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: ApiInfo {
                title: format!("{plural}.{}", descriptor.group),
                version: version.name.clone(),
                description: Some(format!("{kind} resources served at {api_version}")),
            },
            servers,
            paths,
            components: Components {
                schemas,
                security_schemes,
            },
            security: vec![IndexMap::from([(BEARER_AUTH.to_string(), Vec::new())])],
        }
    }
}

fn namespaced_paths(api_version: &str, kind: &str, plural: &str) -> IndexMap<String, PathItem> {
    let plural_title = upper_first(plural);
    let collection = format!("/apis/{api_version}/namespaces/{{namespace}}/{plural}");

    let mut paths = IndexMap::new();
    paths.insert(
        format!("/apis/{api_version}/{plural}"),
        PathItem {
            get: Some(list_operation(
                format!("list{plural_title}AllNamespaces"),
                format!("List {kind} resources across all namespaces"),
            )),
            ..Default::default()
        },
    );
    paths.insert(
        collection.clone(),
        PathItem {
            get: Some(list_operation(
                format!("list{plural_title}"),
                format!("List {kind} resources in a namespace"),
            )),
            post: Some(create_operation(kind)),
            parameters: vec![namespace_parameter()],
            ..Default::default()
        },
    );
    paths.insert(
        format!("{collection}/{{name}}"),
        item_path(kind, vec![namespace_parameter(), name_parameter()]),
    );
    paths
}

fn cluster_paths(api_version: &str, kind: &str, plural: &str) -> IndexMap<String, PathItem> {
    let collection = format!("/apis/{api_version}/{plural}");

    let mut paths = IndexMap::new();
    paths.insert(
        collection.clone(),
        PathItem {
            get: Some(list_operation(
                format!("list{}", upper_first(plural)),
                format!("List {kind} resources"),
            )),
            post: Some(create_operation(kind)),
            ..Default::default()
        },
    );
    paths.insert(
        format!("{collection}/{{name}}"),
        item_path(kind, vec![name_parameter()]),
    );
    paths
}

fn item_path(kind: &str, parameters: Vec<Parameter>) -> PathItem {
    PathItem {
        get: Some(Operation {
            operation_id: format!("get{kind}"),
            summary: format!("Get a {kind}"),
            request_body: None,
            responses: responses("200", "OK", Some(RESOURCE_SCHEMA)),
        }),
        put: Some(Operation {
            operation_id: format!("update{kind}"),
            summary: format!("Replace a {kind}"),
            request_body: Some(resource_body()),
            responses: responses("200", "OK", Some(RESOURCE_SCHEMA)),
        }),
        delete: Some(Operation {
            operation_id: format!("delete{kind}"),
            summary: format!("Delete a {kind}"),
            request_body: None,
            responses: responses("200", "Deleted", None),
        }),
        parameters,
        ..Default::default()
    }
}

fn list_operation(operation_id: String, summary: String) -> Operation {
    Operation {
        operation_id,
        summary,
        request_body: None,
        responses: responses("200", "OK", Some(RESOURCE_LIST_SCHEMA)),
    }
}

fn create_operation(kind: &str) -> Operation {
    Operation {
        operation_id: format!("create{kind}"),
        summary: format!("Create a {kind}"),
        request_body: Some(resource_body()),
        responses: responses("201", "Created", Some(RESOURCE_SCHEMA)),
    }
}

fn responses(status: &str, description: &str, schema: Option<&str>) -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();
    responses.insert(
        status.to_string(),
        Response {
            description: description.to_string(),
            content: schema.map(json_content),
        },
    );
    responses.insert(
        "401".to_string(),
        Response {
            description: "Unauthorized".to_string(),
            content: None,
        },
    );
    responses
}

fn resource_body() -> RequestBody {
    RequestBody {
        required: true,
        content: json_content(RESOURCE_SCHEMA),
    }
}

fn json_content(schema: &str) -> IndexMap<String, MediaType> {
    IndexMap::from([(
        "application/json".to_string(),
        MediaType {
            schema: schema_ref(schema),
        },
    )])
}

fn schema_ref(schema: &str) -> Value {
    let mut map = Mapping::new();
    map.insert("$ref".into(), format!("#/components/schemas/{schema}").into());
    Value::Mapping(map)
}

fn path_parameter(name: &str, description: &str) -> Parameter {
    let mut schema = Mapping::new();
    schema.insert("type".into(), "string".into());
    Parameter {
        name: name.to_string(),
        location: "path".to_string(),
        required: true,
        description: Some(description.to_string()),
        schema: Value::Mapping(schema),
    }
}

fn namespace_parameter() -> Parameter {
    path_parameter("namespace", "Namespace of the resource")
}

fn name_parameter() -> Parameter {
    path_parameter("name", "Name of the resource")
}

fn string_property(description: &str) -> Value {
    let mut map = Mapping::new();
    map.insert("type".into(), "string".into());
    map.insert("description".into(), description.into());
    Value::Mapping(map)
}

/// Resource schema: identity fields first, then the version schema's own properties
fn resource_schema(version: &VersionDescriptor, api_version: &str, kind: &str) -> Value {
    let mut properties = Mapping::new();
    properties.insert("apiVersion".into(), string_property(api_version));
    properties.insert("kind".into(), string_property(kind));

    let mut metadata = Mapping::new();
    metadata.insert("type".into(), "object".into());
    properties.insert("metadata".into(), Value::Mapping(metadata));

    let mut schema = Mapping::new();
    schema.insert("type".into(), "object".into());

    if let Some(Value::Mapping(rendered)) = version.api_schema().map(|s| s.to_value()) {
        for (key, value) in rendered {
            if key.as_str() == Some("type") {
                continue;
            }
            match value {
                Value::Mapping(own) if key.as_str() == Some("properties") => {
                    properties.extend(own)
                }
                value => {
                    schema.insert(key, value);
                }
            }
        }
    }

    schema.insert("properties".into(), Value::Mapping(properties));
    Value::Mapping(schema)
}

fn resource_list_schema() -> Value {
    let mut items = Mapping::new();
    items.insert("type".into(), "array".into());
    items.insert("items".into(), schema_ref(RESOURCE_SCHEMA));

    let mut properties = Mapping::new();
    properties.insert("apiVersion".into(), string_property("API version of the list"));
    properties.insert("kind".into(), string_property("Kind of the list"));
    properties.insert("items".into(), Value::Mapping(items));

    let mut schema = Mapping::new();
    schema.insert("type".into(), "object".into());
    schema.insert("properties".into(), Value::Mapping(properties));
    Value::Mapping(schema)
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_crd::{ClusterRef, DescriptorKind, ResourceNames, ResourceScope, SchemaNode};

    fn xrd(scope: Option<ResourceScope>) -> ResourceDescriptor {
        let mut d = ResourceDescriptor::new(
            DescriptorKind::Xrd,
            "xdatabases.example.org",
            "example.org",
            ResourceNames::new("XDatabase", "xdatabases"),
        );
        d.claim_names = Some(ResourceNames::new("Database", "databases"));
        d.declared_scope = scope;
        d.add_cluster(ClusterRef::new("prod").with_url("https://prod.example.com"));
        d.add_cluster(ClusterRef::new("staging"));
        d
    }

    fn schema(yaml: &str) -> SchemaNode {
        SchemaNode::from_value(&serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn operation_ids(doc: &OpenApiDocument) -> Vec<&str> {
        doc.paths
            .values()
            .flat_map(|item| [&item.get, &item.post, &item.put, &item.delete])
            .filter_map(|op| op.as_ref().map(|op| op.operation_id.as_str()))
            .collect()
    }

    #[test]
    fn test_namespaced_paths_for_claim() {
        let doc = OpenApiDocAssembler::new().assemble(&xrd(None), &VersionDescriptor::new("v1alpha1"));

        let paths: Vec<_> = doc.paths.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "/apis/example.org/v1alpha1/databases",
                "/apis/example.org/v1alpha1/namespaces/{namespace}/databases",
                "/apis/example.org/v1alpha1/namespaces/{namespace}/databases/{name}",
            ]
        );
        assert_eq!(
            operation_ids(&doc),
            vec![
                "listDatabasesAllNamespaces",
                "listDatabases",
                "createDatabase",
                "getDatabase",
                "updateDatabase",
                "deleteDatabase",
            ]
        );
    }

    #[test]
    fn test_cluster_paths_for_direct_xr() {
        let doc = OpenApiDocAssembler::new().assemble(
            &xrd(Some(ResourceScope::Cluster)),
            &VersionDescriptor::new("v1"),
        );

        let paths: Vec<_> = doc.paths.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "/apis/example.org/v1/xdatabases",
                "/apis/example.org/v1/xdatabases/{name}",
            ]
        );
        assert_eq!(
            operation_ids(&doc),
            vec![
                "listXdatabases",
                "createXDatabase",
                "getXDatabase",
                "updateXDatabase",
                "deleteXDatabase",
            ]
        );
        assert!(doc
            .paths
            .values()
            .all(|item| item.parameters.iter().all(|p| p.name != "namespace")));
    }

    #[test]
    fn test_servers_and_security() {
        let doc = OpenApiDocAssembler::new().assemble(&xrd(None), &VersionDescriptor::new("v1"));

        assert_eq!(doc.servers.len(), 2);
        assert_eq!(doc.servers[0].url, "https://prod.example.com");
        assert_eq!(doc.servers[0].description.as_deref(), Some("prod"));
        assert_eq!(doc.servers[1].url, "staging");

        assert_eq!(doc.security.len(), 1);
        assert!(doc.security[0].contains_key(BEARER_AUTH));
        assert_eq!(
            doc.components.security_schemes[BEARER_AUTH],
            SecurityScheme::bearer_jwt()
        );
    }

    #[test]
    fn test_generated_schema_is_preferred() {
        let mut version = VersionDescriptor::new("v1");
        version.schema = Some(schema(
            "type: object\nproperties:\n  spec: {type: object, properties: {declared: {type: string}}}",
        ));
        version.generated_schema = Some(schema(
            "type: object\nproperties:\n  spec: {type: object, properties: {generated: {type: string}}}\n  status: {type: object}",
        ));

        let doc = OpenApiDocAssembler::new().assemble(&xrd(None), &version);
        let resource = &doc.components.schemas[RESOURCE_SCHEMA];
        let properties = resource.get("properties").unwrap();

        assert!(properties.get("status").is_some());
        let spec = properties.get("spec").unwrap();
        assert!(spec.get("properties").unwrap().get("generated").is_some());
        assert!(spec.get("properties").unwrap().get("declared").is_none());
    }

    #[test]
    fn test_missing_schema_still_has_identity_fields() {
        let doc = OpenApiDocAssembler::new().assemble(&xrd(None), &VersionDescriptor::new("v1"));
        let properties = doc.components.schemas[RESOURCE_SCHEMA]
            .get("properties")
            .unwrap();
        let keys: Vec<_> = properties
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["apiVersion", "kind", "metadata"]);
    }

    #[test]
    fn test_serialized_keys() {
        let doc = OpenApiDocAssembler::new().assemble(&xrd(None), &VersionDescriptor::new("v1"));
        let yaml = serde_yaml::to_string(&doc).unwrap();
        assert!(yaml.contains("operationId: listDatabasesAllNamespaces"));
        assert!(yaml.contains("securitySchemes:"));
        assert!(yaml.contains("bearerFormat: JWT"));
        assert!(yaml.contains("in: path"));
        assert!(yaml.contains("$ref:"));
        assert!(yaml.contains("#/components/schemas/ResourceList"));
    }
}
