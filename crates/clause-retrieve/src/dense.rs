//! Dense retrieval over chunk embeddings.
//!
//! This is the in-process half of the Vector Store contract (§4.6): brute
//! force cosine similarity over L2-normalized embeddings, with optional
//! metadata filtering. It backs the local `DenseIndex` used when no
//! external vector database is configured; an operator who points
//! `VECTOR_STORE_PATH` at a real ChromaDB deployment instead goes through
//! the `VectorStoreBackend` trait in [`crate::integration`], which this
//! type also implements.
//!
//! Brute force is the right default here: §4.6 targets corpora in the
//! tens-of-thousands-of-chunks range (an insurer's clause library), not
//! web-scale, so O(n*d) per query is fast enough without an ANN index.

use crate::RetrieveError;

/// Dense retriever using cosine similarity over L2-normalized embeddings.
pub struct DenseRetriever {
    documents: Vec<(u32, Vec<f32>)>,
    metadata: Option<crate::filtering::MetadataStore>,
}

impl DenseRetriever {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            metadata: None,
        }
    }

    /// Create a retriever with metadata support for filtering (§4.6's `where`).
    pub fn with_metadata() -> Self {
        Self {
            documents: Vec::new(),
            metadata: Some(crate::filtering::MetadataStore::new()),
        }
    }

    pub fn add_metadata(
        &mut self,
        doc_id: u32,
        metadata: crate::filtering::DocumentMetadata,
    ) -> Result<(), RetrieveError> {
        match self.metadata.as_mut() {
            Some(store) => {
                store.add(doc_id, metadata);
                Ok(())
            }
            None => Err(RetrieveError::Other(
                "metadata store not initialized; use DenseRetriever::with_metadata()".to_string(),
            )),
        }
    }

    pub fn remove_metadata(&mut self, doc_id: u32) {
        if let Some(store) = self.metadata.as_mut() {
            store.remove(doc_id);
        }
    }

    pub fn metadata(&self) -> Option<&crate::filtering::MetadataStore> {
        self.metadata.as_ref()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Add or replace a document's embedding.
    pub fn add_document(&mut self, doc_id: u32, embedding: Vec<f32>) {
        if let Some(slot) = self.documents.iter_mut().find(|(id, _)| *id == doc_id) {
            slot.1 = embedding;
        } else {
            self.documents.push((doc_id, embedding));
        }
    }

    /// Remove a document (used by delete-by-predicate reindex flows).
    pub fn remove_document(&mut self, doc_id: u32) {
        self.documents.retain(|(id, _)| *id != doc_id);
        self.remove_metadata(doc_id);
    }

    /// Cosine similarity between two equal-length vectors. Assumes L2-normalized
    /// inputs, for which cosine similarity reduces to a plain dot product.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    pub fn score(&self, doc_id: u32, query_embedding: &[f32]) -> Option<f32> {
        self.documents
            .iter()
            .find(|(id, _)| *id == doc_id)
            .map(|(_, doc_embedding)| Self::cosine_similarity(doc_embedding, query_embedding))
    }

    /// Retrieve top-k documents by cosine similarity.
    pub fn retrieve(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(u32, f32)>, RetrieveError> {
        if query_embedding.is_empty() {
            return Err(RetrieveError::EmptyQuery);
        }
        if self.documents.is_empty() {
            return Err(RetrieveError::EmptyIndex);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_dim = query_embedding.len();

        if k < self.documents.len() / 2 {
            use std::cmp::Reverse;
            use std::collections::BinaryHeap;

            #[derive(PartialEq)]
            struct FloatOrd(f32);
            impl Eq for FloatOrd {}
            impl PartialOrd for FloatOrd {
                fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                    Some(self.cmp(other))
                }
            }
            impl Ord for FloatOrd {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                    self.0
                        .partial_cmp(&other.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                }
            }

            let mut heap: BinaryHeap<Reverse<(FloatOrd, u32)>> = BinaryHeap::with_capacity(k + 1);

            for (doc_id, doc_embedding) in &self.documents {
                if doc_embedding.len() != query_dim {
                    return Err(RetrieveError::DimensionMismatch {
                        query_dim,
                        doc_dim: doc_embedding.len(),
                    });
                }
                let score = Self::cosine_similarity(doc_embedding, query_embedding);
                if score.is_finite() && score > 0.0 {
                    if heap.len() < k {
                        heap.push(Reverse((FloatOrd(score), *doc_id)));
                    } else if let Some(&Reverse((FloatOrd(min_score), _))) = heap.peek() {
                        if score > min_score {
                            heap.pop();
                            heap.push(Reverse((FloatOrd(score), *doc_id)));
                        }
                    }
                }
            }

            let mut results: Vec<(u32, f32)> = heap
                .into_iter()
                .map(|Reverse((FloatOrd(score), doc_id))| (doc_id, score))
                .collect();
            results.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            Ok(results)
        } else {
            let mut scored: Vec<(u32, f32)> = Vec::with_capacity(self.documents.len());
            for (doc_id, doc_embedding) in &self.documents {
                if doc_embedding.len() != query_dim {
                    return Err(RetrieveError::DimensionMismatch {
                        query_dim,
                        doc_dim: doc_embedding.len(),
                    });
                }
                scored.push((*doc_id, Self::cosine_similarity(doc_embedding, query_embedding)));
            }
            scored.sort_unstable_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            Ok(scored.into_iter().take(k).collect())
        }
    }

    /// Retrieve top-k documents matching a metadata filter (§4.8's `where`).
    ///
    /// Oversamples based on estimated filter selectivity, then post-filters.
    /// Returns fewer than `k` results (never an error) if the filter is
    /// strict enough that the corpus doesn't have k matches.
    pub fn retrieve_with_filter(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: &crate::filtering::FilterPredicate,
    ) -> Result<Vec<(u32, f32)>, RetrieveError> {
        let metadata_store = self.metadata.as_ref().ok_or_else(|| {
            RetrieveError::Other(
                "metadata store not initialized; use DenseRetriever::with_metadata()".to_string(),
            )
        })?;

        let selectivity = metadata_store.estimate_selectivity(filter).unwrap_or(0.5);
        let oversample_factor = (1.0 / selectivity.max(0.01)).ceil() as usize;
        let search_k = (k * oversample_factor).max(k).min(self.documents.len().max(1));

        let candidates = match self.retrieve(query_embedding, search_k) {
            Ok(c) => c,
            Err(RetrieveError::EmptyIndex) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(candidates
            .into_iter()
            .filter(|(doc_id, _)| metadata_store.matches(*doc_id, filter))
            .take(k)
            .collect())
    }
}

impl Default for DenseRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::integration::VectorStoreBackend for DenseRetriever {
    fn upsert(
        &mut self,
        chunks: &[(u32, Vec<f32>, crate::filtering::DocumentMetadata)],
    ) -> Result<(), RetrieveError> {
        if self.metadata.is_none() {
            self.metadata = Some(crate::filtering::MetadataStore::new());
        }
        for (id, embedding, metadata) in chunks {
            self.add_document(*id, embedding.clone());
            self.metadata.as_mut().unwrap().add(*id, metadata.clone());
        }
        Ok(())
    }

    fn delete(&mut self, r#where: &crate::filtering::FilterPredicate) -> Result<(), RetrieveError> {
        let ids = self
            .metadata
            .as_ref()
            .map(|store| store.ids_matching(r#where))
            .unwrap_or_default();
        for id in ids {
            self.remove_document(id);
        }
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        k: usize,
        r#where: Option<&crate::filtering::FilterPredicate>,
    ) -> Result<Vec<(u32, f32)>, RetrieveError> {
        match r#where {
            Some(filter) => self.retrieve_with_filter(vector, k, filter),
            None => self.retrieve(vector, k),
        }
    }

    fn stats(&self) -> (usize, usize) {
        let dim = self.documents.first().map(|(_, e)| e.len()).unwrap_or(0);
        (self.documents.len(), dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::{FilterPredicate, MetadataValue};

    #[test]
    fn dense_retrieval_ranks_by_cosine_similarity() {
        let mut retriever = DenseRetriever::new();
        retriever.add_document(0, vec![1.0, 0.0]);
        retriever.add_document(1, vec![0.707, 0.707]);

        let query = vec![1.0, 0.0];
        let results = retriever.retrieve(&query, 10).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 0.001);
        assert!((results[1].1 - 0.707).abs() < 0.01);
    }

    #[test]
    fn retrieve_with_filter_respects_predicate() {
        let mut retriever = DenseRetriever::with_metadata();
        retriever.add_document(0, vec![1.0, 0.0]);
        retriever.add_document(1, vec![0.9, 0.1]);
        retriever
            .add_metadata(0, [("category".to_string(), MetadataValue::from("Exclusion"))].into())
            .unwrap();
        retriever
            .add_metadata(1, [("category".to_string(), MetadataValue::from("General"))].into())
            .unwrap();

        let filter = FilterPredicate::equals("category", "Exclusion");
        let results = retriever
            .retrieve_with_filter(&[1.0, 0.0], 5, &filter)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn retrieve_with_filter_returns_fewer_than_k_without_erroring() {
        let mut retriever = DenseRetriever::with_metadata();
        retriever.add_document(0, vec![1.0, 0.0]);
        retriever
            .add_metadata(0, [("category".to_string(), MetadataValue::from("General"))].into())
            .unwrap();

        let filter = FilterPredicate::equals("category", "Exclusion");
        let results = retriever.retrieve_with_filter(&[1.0, 0.0], 5, &filter).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn remove_document_drops_it_from_results() {
        let mut retriever = DenseRetriever::new();
        retriever.add_document(0, vec![1.0, 0.0]);
        retriever.add_document(1, vec![0.0, 1.0]);
        retriever.remove_document(0);

        let results = retriever.retrieve(&[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, 1);
    }
}
