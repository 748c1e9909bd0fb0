//! Instance-attribute matching
//!
//! Each clause of an [`InstanceFilter`] is checked on its own against the
//! instances carried by a notification: it passes when it is match-all or
//! when any instance satisfies it. Different clauses may be satisfied by
//! different instances.
//!
//! The provider tree is stricter: one instance has to satisfy a complete
//! provider -> product -> version path. The search is depth-first and stops
//! at the first accepted path.

use crate::types::{
    InstanceFilter, ProductNode, ProviderNode, VersionNode, VnfInstanceDescriptor,
};

/// Whether the instances of a notification satisfy the instance filter
pub fn instance_matches(filter: &InstanceFilter, candidates: &[VnfInstanceDescriptor]) -> bool {
    filter
        .vnfd_ids
        .admits_any(candidates.iter().map(|c| c.vnfd_id.as_str()))
        && products_match(&filter.vnf_products_from_providers, candidates)
        && filter
            .vnf_instance_ids
            .admits_any(candidates.iter().map(|c| c.vnf_instance_id.as_str()))
        && filter
            .vnf_instance_names
            .admits_any(candidates.iter().filter_map(|c| c.vnf_instance_name.as_deref()))
}

/// Provider tree check; an empty tree admits everything
pub fn products_match(providers: &[ProviderNode], candidates: &[VnfInstanceDescriptor]) -> bool {
    providers.is_empty() || candidates.iter().any(|c| any_path(providers, c))
}

/// A level of the provider/product/version tree
trait PathNode {
    /// Whether the node itself accepts the candidate
    fn accepts(&self, candidate: &VnfInstanceDescriptor) -> bool;
}

/// Depth-first: some sibling accepts the candidate
///
/// Only called on non-empty levels. Empty nested levels are handled by the
/// parent and mean "anything below".
fn any_path<N: PathNode>(nodes: &[N], candidate: &VnfInstanceDescriptor) -> bool {
    nodes.iter().any(|node| node.accepts(candidate))
}

impl PathNode for ProviderNode {
    fn accepts(&self, candidate: &VnfInstanceDescriptor) -> bool {
        self.vnf_provider == candidate.vnf_provider
            && (self.vnf_products.is_empty() || any_path(&self.vnf_products, candidate))
    }
}

impl PathNode for ProductNode {
    fn accepts(&self, candidate: &VnfInstanceDescriptor) -> bool {
        self.vnf_product_name == candidate.vnf_product_name
            && (self.versions.is_empty() || any_path(&self.versions, candidate))
    }
}

impl PathNode for VersionNode {
    fn accepts(&self, candidate: &VnfInstanceDescriptor) -> bool {
        self.vnf_software_version == candidate.vnf_software_version
            && self.vnfd_versions.admits(&candidate.vnfd_version)
    }
}
