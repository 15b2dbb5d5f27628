//! Metadata filtering for the dense and sparse indices.
//!
//! `PolicyChunk` metadata (company, product_code, doc_type, category, ...) is
//! stored as scalar values per §4.6: strings, booleans, or integers. A
//! `FilterPredicate` narrows a query to the subset of chunks whose metadata
//! satisfies it; the hybrid retriever applies the same predicate to the
//! dense side and uses it to drop non-matching sparse results post-hoc.

use std::collections::HashMap;

/// A scalar metadata value. Vector-store metadata is restricted to scalars;
/// list-valued fields (e.g. keywords) are serialized to delimited strings
/// before being stored here.
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    Int(i64),
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// Document metadata: field name -> scalar value.
pub type DocumentMetadata = HashMap<String, MetadataValue>;

/// Filter predicate for metadata-based filtering (company, product_code,
/// product_name, doc_type, category per §4.8).
#[derive(Clone, Debug)]
pub enum FilterPredicate {
    /// Equality filter: field must equal value.
    Equals { field: String, value: MetadataValue },
    /// Multiple filters, all must hold.
    And(Vec<FilterPredicate>),
    /// Multiple filters, any must hold.
    Or(Vec<FilterPredicate>),
}

impl FilterPredicate {
    pub fn equals(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check if a document's metadata satisfies this filter.
    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        match self {
            Self::Equals { field, value } => metadata.get(field) == Some(value),
            Self::And(predicates) => predicates.iter().all(|p| p.matches(metadata)),
            Self::Or(predicates) => predicates.iter().any(|p| p.matches(metadata)),
        }
    }
}

/// In-memory metadata store used by the dense index to answer filtered
/// queries without round-tripping through the vector store backend.
#[derive(Debug, Default)]
pub struct MetadataStore {
    metadata: HashMap<u32, DocumentMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self {
            metadata: HashMap::new(),
        }
    }

    pub fn add(&mut self, doc_id: u32, metadata: DocumentMetadata) {
        self.metadata.insert(doc_id, metadata);
    }

    pub fn remove(&mut self, doc_id: u32) {
        self.metadata.remove(&doc_id);
    }

    pub fn get(&self, doc_id: u32) -> Option<&DocumentMetadata> {
        self.metadata.get(&doc_id)
    }

    pub fn matches(&self, doc_id: u32, filter: &FilterPredicate) -> bool {
        self.metadata
            .get(&doc_id)
            .is_some_and(|metadata| filter.matches(metadata))
    }

    /// All document ids whose metadata satisfies `filter`.
    pub fn ids_matching(&self, filter: &FilterPredicate) -> Vec<u32> {
        self.metadata
            .iter()
            .filter(|(_, metadata)| filter.matches(metadata))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Estimate the fraction of documents a filter would select. Used to
    /// decide an oversampling factor before a filtered KNN scan.
    pub fn estimate_selectivity(&self, filter: &FilterPredicate) -> Option<f32> {
        if self.metadata.is_empty() {
            return None;
        }
        let matching = self
            .metadata
            .values()
            .filter(|metadata| filter.matches(metadata))
            .count();
        Some(matching as f32 / self.metadata.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetadataValue)]) -> DocumentMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equals_matches_scalar() {
        let metadata = meta(&[
            ("company".into(), "平安人寿".into()),
            ("is_table".into(), MetadataValue::Bool(false)),
        ]);
        assert!(FilterPredicate::equals("company", "平安人寿").matches(&metadata));
        assert!(!FilterPredicate::equals("company", "国寿").matches(&metadata));
        assert!(FilterPredicate::equals("is_table", false).matches(&metadata));
    }

    #[test]
    fn and_requires_all() {
        let metadata = meta(&[
            ("company".into(), "平安人寿".into()),
            ("category".into(), "Exclusion".into()),
        ]);
        let filter = FilterPredicate::And(vec![
            FilterPredicate::equals("company", "平安人寿"),
            FilterPredicate::equals("category", "Exclusion"),
        ]);
        assert!(filter.matches(&metadata));

        let filter = FilterPredicate::And(vec![
            FilterPredicate::equals("company", "平安人寿"),
            FilterPredicate::equals("category", "Liability"),
        ]);
        assert!(!filter.matches(&metadata));
    }

    #[test]
    fn metadata_store_tracks_selectivity() {
        let mut store = MetadataStore::new();
        for i in 0..10u32 {
            store.add(i, meta(&[("category".into(), "General".into())]));
        }
        for i in 10..12u32 {
            store.add(i, meta(&[("category".into(), "Exclusion".into())]));
        }
        let filter = FilterPredicate::equals("category", "Exclusion");
        let selectivity = store.estimate_selectivity(&filter).unwrap();
        assert!((selectivity - (2.0 / 12.0)).abs() < 1e-6);
    }

    #[test]
    fn remove_drops_metadata() {
        let mut store = MetadataStore::new();
        store.add(0, meta(&[("category".into(), "General".into())]));
        store.remove(0);
        assert!(store.get(0).is_none());
    }
}
