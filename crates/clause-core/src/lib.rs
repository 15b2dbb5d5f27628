//! clause-vault: a retrieval service over verified Chinese insurance policy
//! documents, exposing four tools for a downstream LLM to call (§1, §4.9).
//!
//! This crate is the facade: it owns the data model (§3), the relational
//! metadata store, the hybrid retriever orchestration (§4.8, §5), the
//! offline ingestion pipeline (§2), and the tool-layer implementations the
//! `clause-mcp` crate exposes over MCP. Lower layers (`clause-parse`,
//! `clause-chunk`, `clause-enrich`, `clause-retrieve`, `clause-limiter`)
//! each own one stage of the pipeline and are generalized, not duplicated,
//! here.

pub mod config;
pub mod embedder;
pub mod error;
pub mod metadata_store;
pub mod model;
pub mod pipeline;
pub mod retriever;
pub mod tools;

pub use config::Config;
pub use embedder::{Embedder, HashingEmbedder};
pub use error::{ClauseError, ClauseResult};
pub use metadata_store::MetadataStore;
pub use retriever::{HybridRetriever, SharedRetriever};
