//! Error types for the in-process retrieval primitives (BM25, dense index,
//! fusion). These are low-level and deliberately do not attempt to model
//! the eight error kinds of §7 - that mapping happens one layer up, in
//! `clause-core::ClauseError`, which converts `RetrieveError` via `From`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RetrieveError {
    EmptyQuery,
    EmptyIndex,
    InvalidParameter(String),
    DimensionMismatch { query_dim: usize, doc_dim: usize },
    Other(String),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::EmptyQuery => write!(f, "query is empty"),
            RetrieveError::EmptyIndex => write!(f, "index is empty"),
            RetrieveError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            RetrieveError::DimensionMismatch { query_dim, doc_dim } => write!(
                f,
                "dimension mismatch: query has {} dimensions, document has {}",
                query_dim, doc_dim
            ),
            RetrieveError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RetrieveError {}
