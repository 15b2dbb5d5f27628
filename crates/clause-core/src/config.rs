//! Environment-driven configuration (§6).
//!
//! `Config::from_env` loads an optional `.env` (via `dotenvy`, ignored if
//! absent) and then reads the recognized keys from the process environment,
//! falling back to the documented defaults. There is deliberately one
//! `Config` struct, constructed once at startup and passed down by reference
//! or `Arc` - no ambient global state.

use crate::error::{ClauseError, ClauseResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub global_qps: f32,
    pub per_domain_qps: f32,
    pub circuit_breaker_enabled: bool,
    pub circuit_breaker_cooldown_sec: u64,
    pub enable_table_separation: bool,
    pub embed_model_id: String,
    pub vector_store_path: PathBuf,
    pub bm25_index_path: PathBuf,
    pub table_export_dir: PathBuf,
    pub metadata_db_path: PathBuf,
    pub rrf_k: f32,
    pub default_min_similarity: f32,
    pub exclusion_min_similarity: f32,
}

impl Config {
    pub fn from_env() -> ClauseResult<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            global_qps: parse_env("GLOBAL_QPS", 0.8)?,
            per_domain_qps: parse_env("PER_DOMAIN_QPS", 0.8)?,
            circuit_breaker_enabled: parse_env("CIRCUIT_BREAKER_ENABLED", true)?,
            circuit_breaker_cooldown_sec: parse_env("CIRCUIT_BREAKER_COOLDOWN_SEC", 300)?,
            enable_table_separation: parse_env("ENABLE_TABLE_SEPARATION", true)?,
            embed_model_id: std::env::var("EMBED_MODEL_ID")
                .unwrap_or_else(|_| "local-zh-minilm-768".to_string()),
            vector_store_path: path_env("VECTOR_STORE_PATH", "./data/vector_store"),
            bm25_index_path: path_env("BM25_INDEX_PATH", "./data/vector_store/bm25_index.bin"),
            table_export_dir: path_env("TABLE_EXPORT_DIR", "./data/assets/tables"),
            metadata_db_path: path_env("METADATA_DB_PATH", "./data/db/metadata.db"),
            rrf_k: parse_env("RRF_K", 60.0)?,
            default_min_similarity: parse_env("DEFAULT_MIN_SIMILARITY", 0.7)?,
            exclusion_min_similarity: parse_env("EXCLUSION_MIN_SIMILARITY", 0.75)?,
        })
    }
}

fn path_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_env<T>(key: &str, default: T) -> ClauseResult<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ClauseError::InvalidInput(format!("{key}={raw} is not valid"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_when_env_unset() {
        for key in [
            "GLOBAL_QPS",
            "PER_DOMAIN_QPS",
            "CIRCUIT_BREAKER_ENABLED",
            "DEFAULT_MIN_SIMILARITY",
            "EXCLUSION_MIN_SIMILARITY",
        ] {
            std::env::remove_var(key);
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.global_qps, 0.8);
        assert_eq!(config.per_domain_qps, 0.8);
        assert!(config.circuit_breaker_enabled);
        assert_eq!(config.default_min_similarity, 0.7);
        assert_eq!(config.exclusion_min_similarity, 0.75);
    }

    #[test]
    fn rejects_unparseable_override() {
        std::env::set_var("GLOBAL_QPS", "not-a-number");
        let result = Config::from_env();
        std::env::remove_var("GLOBAL_QPS");
        assert!(result.is_err());
    }
}
