//! Transformation of resource descriptors into catalog entities

pub mod config;
pub mod entity;
pub mod form;
pub mod openapi;
pub mod parameters;
pub mod result;
pub mod steps;
pub mod walker;

pub use config::{CrdSelection, GeneratorConfig, PublishConfig, PublishTarget};
pub use entity::{CatalogEntity, EntityAssembler, ENTITY_NAME_MAX_LENGTH};
pub use form::FormField;
pub use openapi::{OpenApiDocAssembler, OpenApiDocument};
pub use parameters::ParameterAssembler;
pub use result::{TransformReport, TransformStatistics, TransformWarning};
pub use steps::{PipelineStep, StepAssembler};
pub use walker::SchemaWalker;
