//! Transform driver
//!
//! Runs one pass from discovered Kubernetes objects to catalog entities.
//! Definitions seen on several clusters are merged first, generated composite
//! CRDs and compositions are attached to their XRDs, the configured CRD
//! selection is applied, and then every (resource, version) pair is handed to
//! the entity assembler. Nothing in a pass is fatal: per-resource and
//! per-entity problems become warnings on the report.

use catalog_crd::{
    ClusterRef, CompositionRef, DescriptorKind, DescriptorParser, ParsedObject,
    ResourceDescriptor, VersionDescriptor,
};
use catalog_generator::{
    CatalogEntity, EntityAssembler, GeneratorConfig, TransformReport, TransformWarning,
};
use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::{debug, info, warn};

/// A raw object as supplied by discovery, tagged with its cluster
#[derive(Debug, Clone)]
pub struct DiscoveredObject {
    pub cluster: ClusterRef,
    pub document: Value,
}

impl DiscoveredObject {
    pub fn new(cluster: ClusterRef, document: Value) -> Self {
        Self { cluster, document }
    }

    /// `kind/name` for diagnostics, tolerating malformed objects
    fn label(&self) -> String {
        let kind = self
            .document
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("object");
        let name = self
            .document
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        format!("{kind}/{name}")
    }
}

/// Everything read from the configured sources
#[derive(Debug, Default)]
pub struct Discovery {
    pub objects: Vec<DiscoveredObject>,

    /// Manifest files that were skipped, one `StructuralDefect` each
    pub defects: Vec<TransformWarning>,
}

pub struct TransformDriver {
    config: GeneratorConfig,
    parser: DescriptorParser,
}

impl TransformDriver {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            parser: DescriptorParser::new(),
        }
    }

    /// Full pass over raw objects
    pub fn transform(&self, objects: &[DiscoveredObject]) -> TransformReport {
        let mut report = TransformReport::default();
        let descriptors = self.collect(objects, &mut report);
        self.run(descriptors, &mut report);
        report
    }

    /// Full pass over a discovery, keeping its skipped files on the report
    pub fn transform_discovery(&self, discovery: Discovery) -> TransformReport {
        let mut report = TransformReport::default();
        for defect in discovery.defects {
            record(&mut report, defect);
        }
        let descriptors = self.collect(&discovery.objects, &mut report);
        self.run(descriptors, &mut report);
        report
    }

    /// Parse, merge and link everything discovered into descriptors
    fn collect(
        &self,
        objects: &[DiscoveredObject],
        report: &mut TransformReport,
    ) -> Vec<ResourceDescriptor> {
        let mut definitions: IndexMap<(DescriptorKind, String), ResourceDescriptor> =
            IndexMap::new();
        let mut compositions: Vec<CompositionRef> = Vec::new();

        for object in objects {
            match self.parser.parse_document(&object.document, &object.cluster) {
                Ok(Some(ParsedObject::Definition(descriptor))) => {
                    let key = (descriptor.kind, descriptor.name.clone());
                    match definitions.get_mut(&key) {
                        Some(existing) => {
                            debug!(
                                "Merging {} seen on cluster {}",
                                descriptor.name, object.cluster.name
                            );
                            existing.merge(descriptor);
                        }
                        None => {
                            definitions.insert(key, descriptor);
                        }
                    }
                }
                Ok(Some(ParsedObject::Composition(composition))) => {
                    compositions.push(composition);
                }
                Ok(None) => {
                    debug!("Ignoring {}", object.label());
                }
                Err(e) => record(
                    report,
                    TransformWarning::StructuralDefect {
                        resource: object.label(),
                        reason: format!("{e:#}"),
                    },
                ),
            }
        }

        absorb_crossplane_crds(&mut definitions);

        let mut descriptors: Vec<ResourceDescriptor> = definitions.into_values().collect();
        for descriptor in descriptors.iter_mut().filter(|d| d.is_xrd()) {
            let matching: Vec<String> = compositions
                .iter()
                .filter(|c| c.implements(descriptor))
                .map(|c| c.name.clone())
                .collect();
            for name in matching {
                descriptor.add_composition(name);
            }
        }

        descriptors
    }

    fn run(&self, descriptors: Vec<ResourceDescriptor>, report: &mut TransformReport) {
        let selection = &self.config.crds;
        let conflicting = selection.is_conflicting();
        if conflicting {
            record(report, TransformWarning::ConflictingCrdSelection);
        }

        let assembler = EntityAssembler::new(&self.config);

        for descriptor in &descriptors {
            if descriptor.is_crd() && (conflicting || !self.selects_crd(descriptor)) {
                debug!("CRD {} is not selected", descriptor.name);
                continue;
            }
            self.process(&assembler, descriptor, report);
        }

        info!(
            "Generated {} templates and {} APIs from {} resources ({} warnings)",
            report.statistics.templates_generated,
            report.statistics.apis_generated,
            report.statistics.resources_processed,
            report.warnings.len()
        );
    }

    /// CRD selection by name patterns or labels; both set is handled by the caller
    fn selects_crd(&self, descriptor: &ResourceDescriptor) -> bool {
        let selection = &self.config.crds;
        if let Some(selector) = &selection.label_selector {
            return selector.matches(&descriptor.labels);
        }
        catalog_crd::parser::matches_filters(&descriptor.name, &selection.targets)
    }

    fn process(
        &self,
        assembler: &EntityAssembler<'_>,
        descriptor: &ResourceDescriptor,
        report: &mut TransformReport,
    ) {
        debug!("Processing {} {}", descriptor.kind, descriptor.name);
        report.statistics.resources_processed += 1;
        report.statistics.record_definition(descriptor.kind);

        let served: Vec<&VersionDescriptor> = descriptor.served_versions().collect();
        if served.is_empty() {
            record(
                report,
                TransformWarning::NoServedVersion {
                    resource: descriptor.name.clone(),
                },
            );
            return;
        }

        let template_versions = match descriptor.kind {
            DescriptorKind::Xrd => served.clone(),
            DescriptorKind::Crd => match crd_template_version(descriptor) {
                Ok(version) => vec![version],
                Err(warning) => {
                    record(report, warning);
                    Vec::new()
                }
            },
        };

        for version in template_versions {
            let entity = assembler.template(descriptor, version);
            self.accept(descriptor, entity, report);
        }

        for version in served {
            let entity = assembler.api(descriptor, version);
            self.accept(descriptor, entity, report);
        }
    }

    fn accept(
        &self,
        descriptor: &ResourceDescriptor,
        entity: Result<CatalogEntity, TransformWarning>,
        report: &mut TransformReport,
    ) {
        let entity = match entity.and_then(|e| e.check_name(&descriptor.name).map(|_| e)) {
            Ok(entity) => entity,
            Err(warning) => {
                if matches!(
                    warning,
                    TransformWarning::NameTooLong { .. } | TransformWarning::InvalidName { .. }
                ) {
                    report.statistics.entities_dropped += 1;
                }
                record(report, warning);
                return;
            }
        };

        if entity.is_template() {
            report.statistics.templates_generated += 1;
        } else {
            report.statistics.apis_generated += 1;
        }
        report.entities.push(entity);
    }
}

/// The single served storage version a CRD template is built from
fn crd_template_version(
    descriptor: &ResourceDescriptor,
) -> Result<&VersionDescriptor, TransformWarning> {
    let storage: Vec<&VersionDescriptor> = descriptor.storage_versions().collect();
    match storage.as_slice() {
        [] => Err(TransformWarning::NoStorageVersion {
            resource: descriptor.name.clone(),
        }),
        [version] if !version.served => Err(TransformWarning::StorageVersionNotServed {
            resource: descriptor.name.clone(),
            version: version.name.clone(),
        }),
        [version] => Ok(version),
        many => Err(TransformWarning::MultipleStorageVersions {
            resource: descriptor.name.clone(),
            versions: many
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Fold the CRDs Crossplane installs for each XRD back into it.
///
/// The composite CRD shares the XRD's name and contributes its per-version
/// schemas. The claim CRD matches the XRD's group and claim kind and carries
/// nothing the XRD does not already describe. Neither is processed as a
/// standalone CRD.
fn absorb_crossplane_crds(
    definitions: &mut IndexMap<(DescriptorKind, String), ResourceDescriptor>,
) {
    let crds: Vec<String> = definitions
        .keys()
        .filter(|(kind, _)| *kind == DescriptorKind::Crd)
        .map(|(_, name)| name.clone())
        .collect();

    for name in crds {
        let composite_key = (DescriptorKind::Xrd, name.clone());
        let crd_key = (DescriptorKind::Crd, name);

        if definitions.contains_key(&composite_key) {
            let Some(crd) = definitions.shift_remove(&crd_key) else {
                continue;
            };
            let Some(xrd) = definitions.get_mut(&composite_key) else {
                continue;
            };

            debug!("Attaching generated schema to {}", xrd.name);
            for crd_version in crd.versions {
                if let Some(version) = xrd.versions.iter_mut().find(|v| v.name == crd_version.name) {
                    version.generated_schema = crd_version.schema;
                }
            }
            continue;
        }

        let claimed_by = definitions.get(&crd_key).and_then(|crd| {
            definitions
                .values()
                .find(|d| d.is_xrd() && claims(d, crd))
                .map(|xrd| xrd.name.clone())
        });
        if let Some(xrd) = claimed_by {
            debug!("Folding claim CRD {} into {}", crd_key.1, xrd);
            definitions.shift_remove(&crd_key);
        }
    }
}

/// Whether `crd` is the claim CRD Crossplane generates for `xrd`
fn claims(xrd: &ResourceDescriptor, crd: &ResourceDescriptor) -> bool {
    xrd.group == crd.group
        && xrd
            .claim_names
            .as_ref()
            .is_some_and(|claim| claim.kind == crd.names.kind)
}

fn record(report: &mut TransformReport, warning: TransformWarning) {
    warn!("{}", warning);
    report.warnings.push(warning);
}
