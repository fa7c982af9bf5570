//! CRD and XRD parsing into checked resource descriptors

pub mod parser;
pub mod schema;
pub mod scope;
pub mod types;

pub use parser::{
    find_yaml_files, CompositionRef, DescriptorParser, FileFailure, LoadedManifests, ParsedObject,
};
pub use schema::{ArraySchema, ObjectSchema, ScalarSchema, SchemaMeta, SchemaNode};
pub use scope::ScopeClassification;
pub use types::{
    ClusterRef, DescriptorKind, LabelSelector, ResourceDescriptor, ResourceNames, ResourceScope,
    VersionDescriptor,
};
