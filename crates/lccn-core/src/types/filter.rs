//! Subscription filter types
//!
//! Two shapes of the same predicate live here:
//! - [`LccnSubscriptionFilter`]: the filter as a subscriber submits it, where
//!   every set-valued clause may be a single string or a list
//! - [`CanonicalFilter`]: the normalized form that is persisted, compared for
//!   duplicates and evaluated by the matcher
//!
//! Absent or empty clauses match everything in both shapes.

use serde::{Deserialize, Serialize};

use crate::normalize::ClauseSet;

// ============================================================================
// Request Filter
// ============================================================================

/// A filter value given either as a single string or as a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn as_slice(&self) -> &[String] {
        match self {
            FilterValue::One(value) => std::slice::from_ref(value),
            FilterValue::Many(values) => values,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.to_string())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        FilterValue::Many(values.into_iter().map(String::from).collect())
    }
}

/// Lifecycle change notification subscription filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LccnSubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_types: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_types: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_states: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_subscription_filter: Option<VnfInstanceSubscriptionFilter>,
}

impl LccnSubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notification_types(mut self, value: impl Into<FilterValue>) -> Self {
        self.notification_types = Some(value.into());
        self
    }

    pub fn with_operation_types(mut self, value: impl Into<FilterValue>) -> Self {
        self.operation_types = Some(value.into());
        self
    }

    pub fn with_operation_states(mut self, value: impl Into<FilterValue>) -> Self {
        self.operation_states = Some(value.into());
        self
    }

    pub fn with_instance_filter(mut self, filter: VnfInstanceSubscriptionFilter) -> Self {
        self.vnf_instance_subscription_filter = Some(filter);
        self
    }
}

/// Filter over the identity of the instances a notification concerns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfInstanceSubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnfd_ids: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_products_from_providers: Option<Vec<VnfProductsFromProvider>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_ids: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_names: Option<FilterValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfProductsFromProvider {
    pub vnf_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_products: Option<Vec<VnfProduct>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfProduct {
    pub vnf_product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<VnfProductVersion>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnfProductVersion {
    pub vnf_software_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnfd_versions: Option<FilterValue>,
}

// ============================================================================
// Canonical Filter
// ============================================================================

/// Normalized subscription filter
///
/// Serializes deterministically: sets are ordered, the provider tree is sorted
/// and merged, match-all clauses are omitted. The serialized document is the
/// persisted form and the duplicate-detection fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CanonicalFilter {
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub notification_types: ClauseSet,
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub operation_types: ClauseSet,
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub operation_states: ClauseSet,
    #[serde(default, skip_serializing_if = "InstanceFilter::is_match_all")]
    pub vnf_instance_subscription_filter: InstanceFilter,
}

impl CanonicalFilter {
    /// A filter without any constraint
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn is_match_all(&self) -> bool {
        self.notification_types.is_match_all()
            && self.operation_types.is_match_all()
            && self.operation_states.is_match_all()
            && self.vnf_instance_subscription_filter.is_match_all()
    }

    /// Serialized document, also used as the duplicate fingerprint
    pub fn to_document(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::Error::InternalError(format!("Failed to serialize filter: {}", e)))
    }

    /// Parse a persisted filter document
    ///
    /// Anything that is not a filter in canonical shape is a data integrity
    /// violation, never an implicit "match all".
    pub fn from_document(document: &str) -> crate::Result<Self> {
        serde_json::from_str(document).map_err(|e| {
            crate::Error::DataIntegrity(format!("Malformed persisted filter: {}", e))
        })
    }
}

/// Normalized instance filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstanceFilter {
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub vnfd_ids: ClauseSet,
    /// Empty means any provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vnf_products_from_providers: Vec<ProviderNode>,
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub vnf_instance_ids: ClauseSet,
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub vnf_instance_names: ClauseSet,
}

impl InstanceFilter {
    pub fn is_match_all(&self) -> bool {
        self.vnfd_ids.is_match_all()
            && self.vnf_products_from_providers.is_empty()
            && self.vnf_instance_ids.is_match_all()
            && self.vnf_instance_names.is_match_all()
    }
}

/// Provider level of the provider/product/version tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderNode {
    pub vnf_provider: String,
    /// Empty means any product of this provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vnf_products: Vec<ProductNode>,
}

/// Product level of the provider/product/version tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductNode {
    pub vnf_product_name: String,
    /// Empty means any software version of this product
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<VersionNode>,
}

/// Version level of the provider/product/version tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VersionNode {
    pub vnf_software_version: String,
    #[serde(default, skip_serializing_if = "ClauseSet::is_match_all")]
    pub vnfd_versions: ClauseSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_filter_accepts_scalar_and_list() {
        let json = r#"{
            "notificationTypes": "VnfLcmOperationOccurrenceNotification",
            "operationTypes": ["INSTANTIATE", "TERMINATE"],
            "vnfInstanceSubscriptionFilter": {
                "vnfProductsFromProviders": [{
                    "vnfProvider": "P1",
                    "vnfProducts": [{
                        "vnfProductName": "A",
                        "versions": [{"vnfSoftwareVersion": "1.0", "vnfdVersions": ["t1"]}]
                    }]
                }]
            }
        }"#;

        let filter: LccnSubscriptionFilter = serde_json::from_str(json).unwrap();
        assert_eq!(
            filter.notification_types,
            Some(FilterValue::One(
                "VnfLcmOperationOccurrenceNotification".to_string()
            ))
        );
        assert_eq!(filter.operation_types.unwrap().as_slice().len(), 2);
        assert!(filter.operation_states.is_none());

        let instance = filter.vnf_instance_subscription_filter.unwrap();
        let providers = instance.vnf_products_from_providers.unwrap();
        assert_eq!(providers[0].vnf_provider, "P1");
    }

    #[test]
    fn test_canonical_document_rejects_unknown_shape() {
        assert!(CanonicalFilter::from_document("{}").unwrap().is_match_all());

        let err = CanonicalFilter::from_document("not json").unwrap_err();
        assert!(matches!(err, crate::Error::DataIntegrity(_)));

        let err = CanonicalFilter::from_document(r#"{"notificationTypes": "x"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::DataIntegrity(_)));

        let err = CanonicalFilter::from_document(r#"{"somethingElse": []}"#).unwrap_err();
        assert!(matches!(err, crate::Error::DataIntegrity(_)));
    }
}
