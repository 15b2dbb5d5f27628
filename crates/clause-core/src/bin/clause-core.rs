use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use clause_core::config::Config;
use clause_core::embedder::HashingEmbedder;
use clause_core::metadata_store::MetadataStore;
use clause_core::model::{DocType, Product};
use clause_core::pipeline;
use clause_core::tools::SearchFilters;

#[derive(Parser)]
#[command(author, version, about = "Retrieval service over verified Chinese insurance policy documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a VERIFIED document against a product so the next `reindex` picks it up.
    Ingest {
        #[arg(long)]
        company: String,
        #[arg(long)]
        product_code: String,
        #[arg(long)]
        product_name: String,
        #[arg(long, value_enum)]
        doc_type: DocTypeArg,
        #[arg(long)]
        source_pdf: PathBuf,
    },
    /// Rebuild the whole hybrid index from every VERIFIED document in the metadata store.
    Reindex,
    /// Run one `search_policy_clause` query against a freshly built index and print JSON.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum DocTypeArg {
    Clause,
    Manual,
    RateTable,
}

impl From<DocTypeArg> for DocType {
    fn from(value: DocTypeArg) -> Self {
        match value {
            DocTypeArg::Clause => DocType::Clause,
            DocTypeArg::Manual => DocType::Manual,
            DocTypeArg::RateTable => DocType::RateTable,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest { company, product_code, product_name, doc_type, source_pdf } => {
            let store = MetadataStore::open(&config.metadata_db_path)?;
            let product = Product {
                id: Uuid::new_v4(),
                product_code: product_code.clone(),
                name: product_name.clone(),
                company: company.clone(),
                category: "life".to_string(),
                publish_time: None,
            };
            store.insert_product_if_absent(&product)?;
            let product = store
                .find_product_by_code(&company, &product_code)?
                .ok_or("product vanished immediately after insert")?;

            let document = clause_core::model::PolicyDocument {
                id: Uuid::new_v4(),
                product_id: product.id,
                doc_type: doc_type.into(),
                filename: source_pdf.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
                local_path: source_pdf.to_string_lossy().to_string(),
                source_url: String::new(),
                file_hash: String::new(),
                file_size: std::fs::metadata(&source_pdf).map(|m| m.len()).unwrap_or(0),
                downloaded_at: chrono::Utc::now(),
                verification_status: clause_core::model::VerificationStatus::Verified,
                reviewer_notes: None,
            };
            store.insert_document(&document)?;
            println!("registered document {} for {company}/{product_code}; run `reindex` to build the index", document.id);
        }

        Command::Reindex => {
            let store = MetadataStore::open(&config.metadata_db_path)?;
            let embedder = HashingEmbedder::new(256);
            let (retriever, failures) = pipeline::reindex_all(
                &store,
                &embedder,
                &config.table_export_dir,
                config.rrf_k,
                Duration::from_secs(5),
            )?;
            println!("reindexed {} chunks across the verified corpus", retriever.len());
            for (document_id, error) in failures {
                eprintln!("document {document_id} failed to ingest: {error}");
            }
        }

        Command::Search { query, top_k } => {
            let store = MetadataStore::open(&config.metadata_db_path)?;
            let embedder = HashingEmbedder::new(256);
            let (retriever, _) = pipeline::reindex_all(
                &store,
                &embedder,
                &config.table_export_dir,
                config.rrf_k,
                Duration::from_secs(5),
            )?;
            let results = clause_core::tools::search_policy_clause(
                &retriever,
                &embedder,
                &query,
                SearchFilters::default(),
                top_k,
                config.default_min_similarity,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}
