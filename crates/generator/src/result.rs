//! Result types for transform operations

use crate::entity::CatalogEntity;
use catalog_crd::DescriptorKind;

/// Recoverable per-resource or per-entity problems.
///
/// None of these abort a batch; they are collected next to whatever
/// entities could be built.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransformWarning {
    #[error("Skipping {resource}: {reason}")]
    StructuralDefect { resource: String, reason: String },

    #[error(
        "Dropping {entity_kind} entity '{name}' for {resource}: name is longer than {limit} characters; \
         shorten the source resource names or adjust the configured name prefix"
    )]
    NameTooLong {
        entity_kind: String,
        name: String,
        resource: String,
        limit: usize,
    },

    #[error(
        "Dropping {entity_kind} entity '{name}' for {resource}: names may only contain \
         alphanumerics, '-', '_' and '.', and must start and end with an alphanumeric"
    )]
    InvalidName {
        entity_kind: String,
        name: String,
        resource: String,
    },

    #[error("Both CRD targets and a CRD label selector are configured; no CRDs will be processed")]
    ConflictingCrdSelection,

    #[error("Skipping templates for {resource}: no version is served")]
    NoServedVersion { resource: String },

    #[error("Skipping template for CRD {resource}: no version is flagged as storage")]
    NoStorageVersion { resource: String },

    #[error("Skipping template for CRD {resource}: multiple storage versions ({versions})")]
    MultipleStorageVersions { resource: String, versions: String },

    #[error("Skipping template for CRD {resource}: storage version {version} is not served")]
    StorageVersionNotServed { resource: String, version: String },

    #[error("Skipping template for {resource}: unresolved placeholder {token} in steps")]
    UnresolvedPlaceholder { resource: String, token: String },
}

/// Entities and warnings from one transform pass
#[derive(Debug, Clone, Default)]
pub struct TransformReport {
    pub entities: Vec<CatalogEntity>,
    pub warnings: Vec<TransformWarning>,
    pub statistics: TransformStatistics,
}

impl TransformReport {
    pub fn templates(&self) -> impl Iterator<Item = &CatalogEntity> {
        self.entities.iter().filter(|e| e.is_template())
    }

    pub fn apis(&self) -> impl Iterator<Item = &CatalogEntity> {
        self.entities.iter().filter(|e| e.is_api())
    }
}

/// Transform statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStatistics {
    /// Selected definitions handed to the entity assembler
    pub resources_processed: usize,

    /// XRDs seen after merging
    pub xrds: usize,

    /// CRDs selected for processing
    pub crds: usize,

    pub templates_generated: usize,
    pub apis_generated: usize,
    pub entities_dropped: usize,
}

impl TransformStatistics {
    pub fn record_definition(&mut self, kind: DescriptorKind) {
        match kind {
            DescriptorKind::Xrd => self.xrds += 1,
            DescriptorKind::Crd => self.crds += 1,
        }
    }
}
