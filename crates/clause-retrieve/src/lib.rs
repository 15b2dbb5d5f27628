//! Hybrid retrieval core for clause-vault: BM25 sparse search, cosine-similarity
//! dense search, query-adaptive Reciprocal Rank Fusion, and metadata filtering.
//!
//! # Pipeline
//!
//! A search request fans out to both indices concurrently (the caller in
//! `clause-core` drives this with `tokio::join!`), then fuses the two ranked
//! lists:
//!
//! - query -> [`bm25::InvertedIndex`] (sparse, lexical) -----\
//!                                                            +-> [`fusion::rrf`] -> ranked chunks
//! - query -> [`dense::DenseRetriever`] (dense, semantic) ---/
//!
//! [`routing::route_query`] inspects the query text to pick fusion weights:
//! section-number and multi-digit queries lean sparse, natural-language
//! questions lean dense.
//!
//! # Persistence
//!
//! Both indices are rebuilt in full on reindex (no incremental updates) and
//! written to a temp path, then atomically swapped over the live path via
//! [`persistence::directory::Directory`]. [`persistence::format::IndexHeader`]
//! is the on-disk header each persisted index carries.
//!
//! # External vector stores
//!
//! [`integration::VectorStoreBackend`] is the seam an operator uses to swap
//! the in-process [`dense::DenseRetriever`] for an external vector database;
//! this crate does not ship a client for any such backend.

pub mod bm25;
pub mod dense;
pub mod error;
pub mod filtering;
pub mod fusion;
pub mod integration;
pub mod persistence;
pub mod routing;
pub mod tokenize;

pub use error::RetrieveError;

#[cfg(test)]
mod tests {
    use crate::bm25::{Bm25Params, InvertedIndex};
    use crate::dense::DenseRetriever;
    use crate::fusion::{rrf, RrfConfig};
    use crate::routing::route_query;

    #[test]
    fn end_to_end_hybrid_search_fuses_both_indices() {
        let mut sparse = InvertedIndex::new();
        sparse.add_document(0, &["责任".to_string(), "免除".to_string()]);
        sparse.add_document(1, &["保险".to_string(), "金额".to_string()]);

        let mut dense = DenseRetriever::new();
        dense.add_document(0, vec![0.9, 0.1]);
        dense.add_document(1, vec![0.1, 0.9]);

        let query_tokens = vec!["责任".to_string(), "免除".to_string()];
        let sparse_hits = sparse.retrieve(&query_tokens, 10, Bm25Params::default()).unwrap();
        let dense_hits = dense.retrieve(&[0.9, 0.1], 10).unwrap();

        let weights = route_query("责任免除");
        let config = RrfConfig::new(60.0, weights.sparse, weights.dense);
        let fused = rrf(&sparse_hits, &dense_hits, 10, config, |id| id);

        assert_eq!(fused[0].id, 0);
    }
}
