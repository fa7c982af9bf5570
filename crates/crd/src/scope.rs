//! Version and scope classification
//!
//! Classification is total: missing or unknown scope values fall back to
//! defaults instead of failing. It is cheap and always recomputed from the
//! descriptor rather than cached.

use crate::types::{DescriptorKind, ResourceDescriptor, ResourceNames, ResourceScope};
use serde::{Deserialize, Serialize};

impl ResourceDescriptor {
    /// Crossplane v2 XRDs are the ones declaring an explicit `scope`.
    /// CRDs have no Crossplane version and are never v2.
    pub fn is_v2(&self) -> bool {
        self.kind == DescriptorKind::Xrd && self.declared_scope.is_some()
    }

    /// Effective scope
    pub fn scope(&self) -> ResourceScope {
        match (self.kind, self.declared_scope) {
            (_, Some(scope)) => scope,
            (DescriptorKind::Xrd, None) => ResourceScope::Cluster,
            (DescriptorKind::Crd, None) => ResourceScope::Namespaced,
        }
    }

    /// Whether users create this resource through a claim
    pub fn uses_claims(&self) -> bool {
        match self.kind {
            DescriptorKind::Crd => false,
            DescriptorKind::Xrd => !self.is_v2() || self.scope() == ResourceScope::LegacyCluster,
        }
    }

    /// v2 XR created directly, without claim indirection
    pub fn is_direct_xr(&self) -> bool {
        self.is_v2()
            && matches!(
                self.scope(),
                ResourceScope::Cluster | ResourceScope::Namespaced
            )
    }

    /// Whether the created resource carries a namespace
    pub fn include_namespace(&self) -> bool {
        match self.kind {
            DescriptorKind::Crd => self.scope() == ResourceScope::Namespaced,
            DescriptorKind::Xrd => {
                !self.is_v2()
                    || matches!(
                        self.scope(),
                        ResourceScope::Namespaced | ResourceScope::LegacyCluster
                    )
            }
        }
    }

    /// Names of the object users actually create: the claim when claims are used
    pub fn resource_names(&self) -> &ResourceNames {
        match &self.claim_names {
            Some(claim) if self.uses_claims() => claim,
            _ => &self.names,
        }
    }

    pub fn resource_kind(&self) -> &str {
        &self.resource_names().kind
    }

    pub fn resource_plural(&self) -> &str {
        &self.resource_names().plural
    }

    /// Snapshot of every classification output
    pub fn classify(&self) -> ScopeClassification {
        ScopeClassification {
            is_v2: self.is_v2(),
            scope: self.scope(),
            uses_claims: self.uses_claims(),
            is_direct_xr: self.is_direct_xr(),
            include_namespace: self.include_namespace(),
        }
    }
}

/// Derived classification of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeClassification {
    pub is_v2: bool,
    pub scope: ResourceScope,
    pub uses_claims: bool,
    pub is_direct_xr: bool,
    pub include_namespace: bool,
}

impl ScopeClassification {
    /// Crossplane API generation label
    pub fn crossplane_version(&self) -> &'static str {
        if self.is_v2 {
            "v2"
        } else {
            "v1"
        }
    }
}
