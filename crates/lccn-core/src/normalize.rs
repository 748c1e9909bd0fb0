//! Filter normalization
//!
//! Turns request filters into [`CanonicalFilter`]s. Every set-valued clause
//! becomes a [`ClauseSet`]; an absent clause and an empty list both become
//! [`ClauseSet::MatchAll`], which admits any value. A clause never
//! normalizes into a set that admits nothing.
//!
//! The persisted form of the top-level clauses is length-indexed
//! ([`IndexedClause`]): a zero length means "match all" and lets readers skip
//! decoding the column entirely.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    CanonicalFilter, FilterValue, InstanceFilter, LccnSubscriptionFilter, ProductNode,
    ProviderNode, VersionNode, VnfInstanceSubscriptionFilter, VnfProduct, VnfProductVersion,
    VnfProductsFromProvider,
};
use crate::{Error, Result};

// ============================================================================
// Clause Sets
// ============================================================================

/// Canonical value of a set-valued filter clause
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClauseSet {
    /// No constraint
    #[default]
    MatchAll,
    /// Value must be one of these; never empty
    AnyOf(BTreeSet<String>),
}

impl ClauseSet {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            ClauseSet::MatchAll
        } else {
            ClauseSet::AnyOf(set)
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, ClauseSet::MatchAll)
    }

    /// Number of values; 0 for match-all
    pub fn len(&self) -> usize {
        match self {
            ClauseSet::MatchAll => 0,
            ClauseSet::AnyOf(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let set = match self {
            ClauseSet::MatchAll => None,
            ClauseSet::AnyOf(set) => Some(set),
        };
        set.into_iter().flatten().map(String::as_str)
    }

    pub fn admits(&self, value: &str) -> bool {
        match self {
            ClauseSet::MatchAll => true,
            ClauseSet::AnyOf(set) => set.contains(value),
        }
    }

    /// A missing value only passes a match-all clause
    pub fn admits_opt(&self, value: Option<&str>) -> bool {
        match value {
            Some(value) => self.admits(value),
            None => self.is_match_all(),
        }
    }

    /// Whether any of the candidate values is admitted
    pub fn admits_any<'a>(&self, mut values: impl Iterator<Item = &'a str>) -> bool {
        match self {
            ClauseSet::MatchAll => true,
            ClauseSet::AnyOf(set) => values.any(|v| set.contains(v)),
        }
    }

    /// Union of two clauses; match-all absorbs
    pub fn union(self, other: ClauseSet) -> ClauseSet {
        match (self, other) {
            (ClauseSet::AnyOf(mut a), ClauseSet::AnyOf(b)) => {
                a.extend(b);
                ClauseSet::AnyOf(a)
            }
            _ => ClauseSet::MatchAll,
        }
    }

    /// JSON array text; `[]` for match-all
    pub fn to_json_array(&self) -> String {
        // Serializing strings into a JSON array cannot fail
        serde_json::to_string(&self.iter().collect::<Vec<_>>()).unwrap_or_else(|_| "[]".into())
    }
}

impl Serialize for ClauseSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ClauseSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<String>::deserialize(deserializer)?;
        Ok(ClauseSet::from_values(values))
    }
}

/// Normalize a single clause value
pub fn normalize(value: Option<&FilterValue>) -> ClauseSet {
    match value {
        Some(value) => ClauseSet::from_values(value.as_slice().iter().cloned()),
        None => ClauseSet::MatchAll,
    }
}

// ============================================================================
// Length-indexed Columns
// ============================================================================

/// Persisted form of a top-level clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedClause {
    /// JSON array text, absent for match-all
    pub values: Option<String>,
    pub len: i64,
}

impl IndexedClause {
    pub fn from_set(set: &ClauseSet) -> Self {
        if set.is_match_all() {
            Self::default()
        } else {
            Self {
                values: Some(set.to_json_array()),
                len: set.len() as i64,
            }
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.len == 0
    }

    /// Decode the column; zero-length columns are not parsed
    pub fn decode(&self, column: &str) -> Result<ClauseSet> {
        if self.len < 0 {
            return Err(Error::DataIntegrity(format!(
                "{} has negative length {}",
                column, self.len
            )));
        }
        if self.len == 0 {
            return Ok(ClauseSet::MatchAll);
        }

        let text = self.values.as_deref().ok_or_else(|| {
            Error::DataIntegrity(format!("{} has length {} but no values", column, self.len))
        })?;
        let values: Vec<String> = serde_json::from_str(text)
            .map_err(|e| Error::DataIntegrity(format!("{} is not a JSON string array: {}", column, e)))?;

        let set = ClauseSet::from_values(values);
        if set.len() as i64 != self.len {
            return Err(Error::DataIntegrity(format!(
                "{} has length {} but holds {} values",
                column,
                self.len,
                set.len()
            )));
        }
        Ok(set)
    }
}

/// Length-indexed columns of the top-level clauses of a filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseIndex {
    pub notification_types: IndexedClause,
    pub operation_types: IndexedClause,
    pub operation_states: IndexedClause,
}

impl ClauseIndex {
    pub fn from_filter(filter: &CanonicalFilter) -> Self {
        Self {
            notification_types: IndexedClause::from_set(&filter.notification_types),
            operation_types: IndexedClause::from_set(&filter.operation_types),
            operation_states: IndexedClause::from_set(&filter.operation_states),
        }
    }

    /// Check the index agrees with the full filter document
    pub fn verify(&self, filter: &CanonicalFilter) -> Result<()> {
        let pairs = [
            ("notification_types", &self.notification_types, &filter.notification_types),
            ("operation_types", &self.operation_types, &filter.operation_types),
            ("operation_states", &self.operation_states, &filter.operation_states),
        ];
        for (column, indexed, clause) in pairs {
            if indexed.len != clause.len() as i64 {
                return Err(Error::DataIntegrity(format!(
                    "{} length {} disagrees with filter document ({} values)",
                    column,
                    indexed.len,
                    clause.len()
                )));
            }
            if !indexed.is_match_all() && indexed.decode(column)? != *clause {
                return Err(Error::DataIntegrity(format!(
                    "{} values disagree with filter document",
                    column
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Filter Normalization
// ============================================================================

/// Normalize a request filter; `None` is the match-all filter
pub fn normalize_filter(filter: Option<&LccnSubscriptionFilter>) -> Result<CanonicalFilter> {
    let Some(filter) = filter else {
        return Ok(CanonicalFilter::match_all());
    };

    Ok(CanonicalFilter {
        notification_types: normalize(filter.notification_types.as_ref()),
        operation_types: normalize(filter.operation_types.as_ref()),
        operation_states: normalize(filter.operation_states.as_ref()),
        vnf_instance_subscription_filter: normalize_instance_filter(
            filter.vnf_instance_subscription_filter.as_ref(),
        )?,
    })
}

fn normalize_instance_filter(
    filter: Option<&VnfInstanceSubscriptionFilter>,
) -> Result<InstanceFilter> {
    let Some(filter) = filter else {
        return Ok(InstanceFilter::default());
    };

    Ok(InstanceFilter {
        vnfd_ids: normalize(filter.vnfd_ids.as_ref()),
        vnf_products_from_providers: normalize_providers(
            filter.vnf_products_from_providers.as_deref().unwrap_or_default(),
        )?,
        vnf_instance_ids: normalize(filter.vnf_instance_ids.as_ref()),
        vnf_instance_names: normalize(filter.vnf_instance_names.as_ref()),
    })
}

// `None` at any level of the tree means "anything below matches"
type VersionMap = BTreeMap<String, ClauseSet>;
type ProductMap = BTreeMap<String, Option<VersionMap>>;

/// Sort the provider tree and merge entries naming the same node
///
/// The tree is an OR at every level, so merging siblings that share a name
/// keeps the set of accepted paths unchanged.
fn normalize_providers(providers: &[VnfProductsFromProvider]) -> Result<Vec<ProviderNode>> {
    let mut merged: BTreeMap<String, Option<ProductMap>> = BTreeMap::new();

    for provider in providers {
        require_name("vnfProvider", &provider.vnf_provider)?;
        let products = normalize_products(provider.vnf_products.as_deref().unwrap_or_default())?;
        merge_into(&mut merged, provider.vnf_provider.clone(), products, merge_products);
    }

    Ok(merged
        .into_iter()
        .map(|(vnf_provider, products)| ProviderNode {
            vnf_provider,
            vnf_products: products
                .unwrap_or_default()
                .into_iter()
                .map(|(vnf_product_name, versions)| ProductNode {
                    vnf_product_name,
                    versions: versions
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(vnf_software_version, vnfd_versions)| VersionNode {
                            vnf_software_version,
                            vnfd_versions,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect())
}

fn normalize_products(products: &[VnfProduct]) -> Result<Option<ProductMap>> {
    if products.is_empty() {
        return Ok(None);
    }

    let mut merged = ProductMap::new();
    for product in products {
        require_name("vnfProductName", &product.vnf_product_name)?;
        let versions = normalize_versions(product.versions.as_deref().unwrap_or_default())?;
        merge_into(&mut merged, product.vnf_product_name.clone(), versions, merge_versions);
    }
    Ok(Some(merged))
}

fn normalize_versions(versions: &[VnfProductVersion]) -> Result<Option<VersionMap>> {
    if versions.is_empty() {
        return Ok(None);
    }

    let mut merged = VersionMap::new();
    for version in versions {
        require_name("vnfSoftwareVersion", &version.vnf_software_version)?;
        let vnfd_versions = normalize(version.vnfd_versions.as_ref());
        match merged.entry(version.vnf_software_version.clone()) {
            Entry::Vacant(e) => {
                e.insert(vnfd_versions);
            }
            Entry::Occupied(mut e) => {
                let current = std::mem::take(e.get_mut());
                *e.get_mut() = current.union(vnfd_versions);
            }
        }
    }
    Ok(Some(merged))
}

fn merge_into<T>(
    map: &mut BTreeMap<String, Option<T>>,
    key: String,
    value: Option<T>,
    merge: fn(T, T) -> T,
) {
    match map.entry(key) {
        Entry::Vacant(e) => {
            e.insert(value);
        }
        Entry::Occupied(mut e) => {
            let merged = match (e.get_mut().take(), value) {
                (Some(a), Some(b)) => Some(merge(a, b)),
                _ => None,
            };
            *e.get_mut() = merged;
        }
    }
}

fn merge_products(mut a: ProductMap, b: ProductMap) -> ProductMap {
    for (name, versions) in b {
        merge_into(&mut a, name, versions, merge_versions);
    }
    a
}

fn merge_versions(mut a: VersionMap, b: VersionMap) -> VersionMap {
    for (version, vnfd_versions) in b {
        let merged = match a.remove(&version) {
            Some(existing) => existing.union(vnfd_versions),
            None => vnfd_versions,
        };
        a.insert(version, merged);
    }
    a
}

fn require_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidFilter(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str, products: Vec<VnfProduct>) -> VnfProductsFromProvider {
        VnfProductsFromProvider {
            vnf_provider: name.to_string(),
            vnf_products: Some(products),
        }
    }

    fn product(name: &str, versions: Vec<VnfProductVersion>) -> VnfProduct {
        VnfProduct {
            vnf_product_name: name.to_string(),
            versions: Some(versions),
        }
    }

    fn version(sw: &str, vnfd_versions: Option<Vec<&str>>) -> VnfProductVersion {
        VnfProductVersion {
            vnf_software_version: sw.to_string(),
            vnfd_versions: vnfd_versions.map(FilterValue::from),
        }
    }

    #[test]
    fn test_empty_and_absent_are_match_all() {
        let absent = normalize(None);
        let empty = normalize(Some(&FilterValue::Many(vec![])));
        let one = normalize(Some(&FilterValue::from(vec!["x"])));

        assert_eq!(absent, ClauseSet::MatchAll);
        assert_eq!(empty, ClauseSet::MatchAll);
        assert_eq!(absent.len(), 0);
        assert_eq!(one.len(), 1);
        assert_ne!(empty, one);

        assert_eq!(IndexedClause::from_set(&empty).len, 0);
        assert_eq!(IndexedClause::from_set(&one).len, 1);
    }

    #[test]
    fn test_scalar_and_list_forms() {
        let scalar = normalize(Some(&FilterValue::from("INSTANTIATE")));
        let list = normalize(Some(&FilterValue::from(vec!["INSTANTIATE", "INSTANTIATE"])));
        assert_eq!(scalar, list);
        assert_eq!(scalar.to_json_array(), r#"["INSTANTIATE"]"#);

        let multi = normalize(Some(&FilterValue::from(vec!["b", "a"])));
        assert_eq!(multi.to_json_array(), r#"["a","b"]"#);
        assert_eq!(ClauseSet::MatchAll.to_json_array(), "[]");

        // Values are compared verbatim
        let padded = normalize(Some(&FilterValue::from(" a ")));
        assert!(padded.admits(" a "));
        assert!(!padded.admits("a"));
    }

    #[test]
    fn test_match_all_admits_everything() {
        let all = ClauseSet::MatchAll;
        assert!(all.admits("anything"));
        assert!(all.admits_opt(None));
        assert!(all.admits_any(std::iter::empty()));

        let some = ClauseSet::from_values(["a"]);
        assert!(some.admits("a"));
        assert!(!some.admits("b"));
        assert!(!some.admits_opt(None));
        assert!(!some.admits_any(std::iter::empty()));
        assert!(some.admits_any(["b", "a"].into_iter()));
    }

    #[test]
    fn test_indexed_clause_decode() {
        let set = ClauseSet::from_values(["x", "y"]);
        let indexed = IndexedClause::from_set(&set);
        assert_eq!(indexed.decode("c").unwrap(), set);

        // Zero length is not parsed at all
        let skipped = IndexedClause {
            values: Some("garbage".into()),
            len: 0,
        };
        assert_eq!(skipped.decode("c").unwrap(), ClauseSet::MatchAll);

        let missing = IndexedClause { values: None, len: 2 };
        assert!(matches!(missing.decode("c"), Err(Error::DataIntegrity(_))));

        let garbage = IndexedClause {
            values: Some("{".into()),
            len: 1,
        };
        assert!(matches!(garbage.decode("c"), Err(Error::DataIntegrity(_))));

        let wrong_len = IndexedClause {
            values: Some(r#"["x"]"#.into()),
            len: 3,
        };
        assert!(matches!(wrong_len.decode("c"), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_clause_index_verify() {
        let filter = normalize_filter(Some(
            &LccnSubscriptionFilter::new().with_notification_types(vec!["a", "b"]),
        ))
        .unwrap();
        let index = ClauseIndex::from_filter(&filter);
        assert!(index.verify(&filter).is_ok());

        let other = CanonicalFilter::match_all();
        assert!(matches!(index.verify(&other), Err(Error::DataIntegrity(_))));

        // Same length, different values
        let mut swapped = index.clone();
        swapped.notification_types.values = Some(r#"["a","c"]"#.into());
        assert!(matches!(swapped.verify(&filter), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn test_none_filter_is_match_all() {
        let filter = normalize_filter(None).unwrap();
        assert!(filter.is_match_all());
        assert_eq!(filter.to_document().unwrap(), "{}");

        let empty = normalize_filter(Some(&LccnSubscriptionFilter::new())).unwrap();
        assert_eq!(filter, empty);
    }

    #[test]
    fn test_provider_tree_is_sorted_and_merged() {
        let request = LccnSubscriptionFilter::new().with_instance_filter(
            VnfInstanceSubscriptionFilter {
                vnf_products_from_providers: Some(vec![
                    provider("P2", vec![product("B", vec![version("1.0", None)])]),
                    provider("P1", vec![product("A", vec![version("1.0", Some(vec!["t2"]))])]),
                    provider("P1", vec![product("A", vec![version("1.0", Some(vec!["t1"]))])]),
                ]),
                ..Default::default()
            },
        );

        let filter = normalize_filter(Some(&request)).unwrap();
        let providers = &filter.vnf_instance_subscription_filter.vnf_products_from_providers;
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].vnf_provider, "P1");
        assert_eq!(
            providers[0].vnf_products[0].versions[0].vnfd_versions,
            ClauseSet::from_values(["t1", "t2"])
        );
        assert_eq!(providers[1].vnf_provider, "P2");
    }

    #[test]
    fn test_provider_merge_with_any_product_absorbs() {
        let request = LccnSubscriptionFilter::new().with_instance_filter(
            VnfInstanceSubscriptionFilter {
                vnf_products_from_providers: Some(vec![
                    provider("P1", vec![product("A", vec![])]),
                    VnfProductsFromProvider {
                        vnf_provider: "P1".into(),
                        vnf_products: None,
                    },
                ]),
                ..Default::default()
            },
        );

        let filter = normalize_filter(Some(&request)).unwrap();
        let providers = &filter.vnf_instance_subscription_filter.vnf_products_from_providers;
        assert_eq!(providers.len(), 1);
        assert!(providers[0].vnf_products.is_empty());
    }

    #[test]
    fn test_equivalent_filters_share_a_document() {
        let a = LccnSubscriptionFilter::new()
            .with_notification_types(vec![
                crate::IDENTIFIER_DELETION_NOTIFICATION,
                crate::IDENTIFIER_CREATION_NOTIFICATION,
            ])
            .with_operation_states(Vec::<&str>::new());
        let b = LccnSubscriptionFilter::new().with_notification_types(vec![
            crate::IDENTIFIER_CREATION_NOTIFICATION,
            crate::IDENTIFIER_DELETION_NOTIFICATION,
        ]);

        let doc_a = normalize_filter(Some(&a)).unwrap().to_document().unwrap();
        let doc_b = normalize_filter(Some(&b)).unwrap().to_document().unwrap();
        assert_eq!(doc_a, doc_b);

        let parsed = CanonicalFilter::from_document(&doc_a).unwrap();
        assert_eq!(parsed, normalize_filter(Some(&b)).unwrap());
    }

    #[test]
    fn test_empty_provider_name_rejected() {
        let request = LccnSubscriptionFilter::new().with_instance_filter(
            VnfInstanceSubscriptionFilter {
                vnf_products_from_providers: Some(vec![provider(" ", vec![])]),
                ..Default::default()
            },
        );
        assert!(matches!(
            normalize_filter(Some(&request)),
            Err(Error::InvalidFilter(_))
        ));
    }
}
