//! Offline ingestion pipeline (§2's control flow; §5's "build new index to
//! a temp path, atomically rename"): a VERIFIED document goes
//! parse -> chunk -> enrich -> embed -> index. A reindex rebuilds a whole
//! new [`HybridRetriever`] generation and the caller swaps it in via
//! [`crate::retriever::shared`]; partial failures on one document never
//! corrupt a generation already in flight for others (§7: offline failures
//! are per-document and do not abort a batch).

use std::path::Path;

use uuid::Uuid;

use clause_retrieve::filtering::{DocumentMetadata, MetadataValue};

use crate::embedder::Embedder;
use crate::error::{ClauseError, ClauseResult};
use crate::metadata_store::MetadataStore;
use crate::model::{Category, DocType, EntityRole, PolicyChunk, TableData};
use crate::retriever::HybridRetriever;

pub struct IngestOutcome {
    pub document_id: Uuid,
    pub chunks_indexed: usize,
    pub rate_tables_exported: usize,
}

/// Parse, chunk, enrich, embed, and index one VERIFIED document into
/// `retriever`. Returns `Err(ClauseError::ParseFailure(..))` on a parse
/// failure - the caller is expected to leave the document PENDING with
/// `reviewer_notes` populated from the error rather than abort the batch.
#[allow(clippy::too_many_arguments)]
pub fn ingest_document(
    retriever: &mut HybridRetriever,
    embedder: &dyn Embedder,
    next_id: &mut u32,
    document_id: Uuid,
    source_pdf: &Path,
    export_dir: &Path,
    company: &str,
    product_code: &str,
    product_name: &str,
    doc_type: DocType,
) -> ClauseResult<IngestOutcome> {
    let parsed = clause_parse::parse_document(source_pdf, export_dir, product_code)?;
    let raw_chunks = clause_chunk::chunk_markdown(&parsed.markdown);

    let mut chunks_indexed = 0;
    for raw in raw_chunks {
        let enriched = clause_enrich::enrich(&raw.content, raw.section_title.as_deref());

        let chunk = PolicyChunk {
            id: PolicyChunk::derive_id(document_id, raw.chunk_index),
            document_id,
            chunk_index: raw.chunk_index,
            content: raw.content,
            company: company.to_string(),
            product_code: product_code.to_string(),
            product_name: product_name.to_string(),
            doc_type,
            section_id: enriched.section_id,
            section_title: raw.section_title,
            parent_section: enriched.parent_section,
            level: raw.level,
            section_path: raw.section_path,
            page_number: None,
            category: Category::from_enrich(enriched.category),
            entity_role: enriched.entity_role.map(EntityRole::from_enrich),
            keywords: enriched.keywords,
            is_table: raw.is_table,
            table_data: raw.table_data.map(|t| TableData { headers: t.headers, rows: t.rows }),
            table_refs: raw.table_refs,
            embedding: None,
        };

        if !chunk.is_well_formed() {
            return Err(ClauseError::InternalError(format!(
                "chunk {} of document {document_id} failed the well-formedness invariant",
                chunk.chunk_index
            )));
        }

        let embedding = embedder.embed(&chunk.content);
        let metadata = chunk_metadata(&chunk);
        let id = *next_id;
        *next_id += 1;
        retriever.index_chunk(id, chunk, embedding, metadata);
        chunks_indexed += 1;
    }

    Ok(IngestOutcome {
        document_id,
        chunks_indexed,
        rate_tables_exported: parsed.rate_tables.len(),
    })
}

fn chunk_metadata(chunk: &PolicyChunk) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::new();
    metadata.insert("company".to_string(), MetadataValue::from(chunk.company.clone()));
    metadata.insert("product_code".to_string(), MetadataValue::from(chunk.product_code.clone()));
    metadata.insert("product_name".to_string(), MetadataValue::from(chunk.product_name.clone()));
    metadata.insert("doc_type".to_string(), MetadataValue::from(chunk.doc_type.as_str()));
    metadata.insert("category".to_string(), MetadataValue::from(chunk.category.as_str()));
    metadata.insert("is_table".to_string(), MetadataValue::from(chunk.is_table));
    metadata
}

/// Rebuild a whole new retriever generation from every VERIFIED document in
/// `store` (§4's "Dense and sparse must be rebuilt together"). A document
/// whose PDF has moved or whose parse fails is skipped and logged, not
/// fatal to the reindex as a whole.
pub fn reindex_all(
    store: &MetadataStore,
    embedder: &dyn Embedder,
    export_dir: &Path,
    rrf_k: f32,
    query_timeout: std::time::Duration,
) -> ClauseResult<(HybridRetriever, Vec<(Uuid, ClauseError)>)> {
    let documents = store.verified_documents()?;
    let mut retriever = HybridRetriever::new(rrf_k, query_timeout);
    let mut next_id = 0u32;
    let mut failures = Vec::new();

    for document in documents {
        let Some(product) = store.find_product_by_id(document.product_id)? else {
            failures.push((document.id, ClauseError::NotFound(format!("product {} not found", document.product_id))));
            continue;
        };

        let result = ingest_document(
            &mut retriever,
            embedder,
            &mut next_id,
            document.id,
            Path::new(&document.local_path),
            export_dir,
            &product.company,
            &product.product_code,
            &product.name,
            document.doc_type,
        );

        if let Err(e) = result {
            tracing::warn!(document_id = %document.id, error = %e, "ingestion failed, leaving document out of this generation");
            failures.push((document.id, e));
        }
    }

    Ok((retriever, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    #[test]
    fn chunk_metadata_carries_filterable_fields() {
        let embedder = HashingEmbedder::new(16);
        let mut retriever = HybridRetriever::new(60.0, std::time::Duration::from_secs(1));
        let mut next_id = 0u32;

        let chunk = PolicyChunk {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            chunk_index: 0,
            content: "责任免除：酒后驾驶不予赔付".to_string(),
            company: "平安人寿".to_string(),
            product_code: "FY001".to_string(),
            product_name: "福耀年金".to_string(),
            doc_type: DocType::Clause,
            section_id: Some("2.1".to_string()),
            section_title: Some("责任免除".to_string()),
            parent_section: Some("2".to_string()),
            level: 2,
            section_path: "责任免除".to_string(),
            page_number: None,
            category: Category::Exclusion,
            entity_role: None,
            keywords: vec![],
            is_table: false,
            table_data: None,
            table_refs: vec![],
            embedding: None,
        };

        let metadata = chunk_metadata(&chunk);
        let embedding = embedder.embed(&chunk.content);
        let id = next_id;
        next_id += 1;
        retriever.index_chunk(id, chunk, embedding, metadata);

        assert_eq!(retriever.len(), 1);
        assert_eq!(next_id, 1);
    }
}
