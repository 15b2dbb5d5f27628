//! The eight error kinds of §7, unified behind one type so tool handlers and
//! the CLI have a single thing to match on. Lower-layer crates keep their own
//! error types (`clause_retrieve::RetrieveError`, `clause_parse::ParseError`,
//! ...) and convert into this one at the boundary via `From`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClauseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Retrieval completed but nothing cleared the threshold. Tool handlers
    /// return this as an empty list with `summary` set, not as a transport
    /// error - kept as a variant so internal plumbing can short-circuit on it.
    #[error("no chunk met the similarity threshold")]
    EmptyResult,

    #[error("circuit open for domain, back off before retrying")]
    CircuitOpen,

    #[error("failed to parse document: {0}")]
    ParseFailure(String),

    #[error("index mismatch: query embedding dimension {query_dim} does not match stored index dimension {index_dim}")]
    IndexMismatch { query_dim: usize, index_dim: usize },

    #[error("operation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<clause_retrieve::RetrieveError> for ClauseError {
    fn from(e: clause_retrieve::RetrieveError) -> Self {
        use clause_retrieve::RetrieveError as R;
        match e {
            R::EmptyQuery | R::EmptyIndex => ClauseError::EmptyResult,
            R::InvalidParameter(msg) => ClauseError::InvalidInput(msg),
            R::DimensionMismatch { query_dim, doc_dim } => ClauseError::IndexMismatch {
                query_dim,
                index_dim: doc_dim,
            },
            R::Other(msg) => ClauseError::InternalError(msg),
        }
    }
}

impl From<clause_limiter::LimiterError> for ClauseError {
    fn from(e: clause_limiter::LimiterError) -> Self {
        match e {
            clause_limiter::LimiterError::CircuitOpen { .. } => ClauseError::CircuitOpen,
            clause_limiter::LimiterError::Cancelled => ClauseError::Timeout,
        }
    }
}

impl From<clause_parse::ParseError> for ClauseError {
    fn from(e: clause_parse::ParseError) -> Self {
        ClauseError::ParseFailure(e.to_string())
    }
}

impl From<rusqlite::Error> for ClauseError {
    fn from(e: rusqlite::Error) -> Self {
        ClauseError::InternalError(format!("metadata store error: {e}"))
    }
}

impl From<tokio::time::error::Elapsed> for ClauseError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ClauseError::Timeout
    }
}

pub type ClauseResult<T> = Result<T, ClauseError>;
