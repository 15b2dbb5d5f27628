//! Vector Store backend trait (§4.6).
//!
//! `DenseRetriever` is clause-retrieve's built-in, in-process vector store.
//! An operator may instead point the crate at an external store such as
//! ChromaDB; this module defines the trait such a backend implements so the
//! hybrid retriever can treat "local brute-force index" and "external
//! vector database" interchangeably. clause-retrieve ships no ChromaDB
//! client itself - §1 treats the vector store as an external collaborator
//! behind this trait, opaque to the core.
//!
//! ```rust,no_run
//! use clause_retrieve::integration::VectorStoreBackend;
//! use clause_retrieve::filtering::{DocumentMetadata, FilterPredicate};
//! use clause_retrieve::RetrieveError;
//!
//! struct MyChromaAdapter;
//!
//! impl VectorStoreBackend for MyChromaAdapter {
//!     fn upsert(&mut self, _chunks: &[(u32, Vec<f32>, DocumentMetadata)]) -> Result<(), RetrieveError> {
//!         Ok(())
//!     }
//!     fn delete(&mut self, _where: &FilterPredicate) -> Result<(), RetrieveError> {
//!         Ok(())
//!     }
//!     fn query(&self, _vector: &[f32], _k: usize, _where: Option<&FilterPredicate>) -> Result<Vec<(u32, f32)>, RetrieveError> {
//!         Ok(vec![])
//!     }
//!     fn stats(&self) -> (usize, usize) {
//!         (0, 0)
//!     }
//! }
//! ```

use crate::filtering::{DocumentMetadata, FilterPredicate};
use crate::RetrieveError;

/// Contract every vector store backend (local or external) satisfies, per §4.6.
pub trait VectorStoreBackend {
    /// Bulk insert/replace. Each entry is (id, embedding, metadata).
    fn upsert(&mut self, chunks: &[(u32, Vec<f32>, DocumentMetadata)]) -> Result<(), RetrieveError>;

    /// Delete all entries matching a metadata predicate (typically document_id).
    fn delete(&mut self, r#where: &FilterPredicate) -> Result<(), RetrieveError>;

    /// Cosine-similarity KNN query with an optional equality filter.
    fn query(
        &self,
        vector: &[f32],
        k: usize,
        r#where: Option<&FilterPredicate>,
    ) -> Result<Vec<(u32, f32)>, RetrieveError>;

    /// (count, dimension) - dimension is 0 for an empty store.
    fn stats(&self) -> (usize, usize);
}
