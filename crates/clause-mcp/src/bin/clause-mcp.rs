use std::sync::Arc;
use std::time::Duration;

use clause_core::config::Config;
use clause_core::embedder::HashingEmbedder;
use clause_core::metadata_store::MetadataStore;
use clause_core::pipeline;
use clause_core::retriever;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let store = Arc::new(MetadataStore::open(&config.metadata_db_path)?);
    let embedder: Arc<dyn clause_core::Embedder> = Arc::new(HashingEmbedder::new(256));

    let (built, failures) = pipeline::reindex_all(
        &store,
        embedder.as_ref(),
        &config.table_export_dir,
        config.rrf_k,
        Duration::from_secs(5),
    )?;
    for (document_id, error) in &failures {
        tracing::warn!(document_id = %document_id, error = %error, "document excluded from this index generation");
    }
    tracing::info!(chunks = built.len(), failures = failures.len(), "initial index built");

    let shared = retriever::shared(built);
    clause_mcp::serve_stdio(shared, store, embedder).await?;

    Ok(())
}
