//! Hybrid retrieval orchestration (§4.8, §5): joins the sparse and dense
//! sides of `clause-retrieve`, applies query-adaptive fusion, and enforces
//! the similarity-threshold and filter-respecting guarantees the tool layer
//! depends on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clause_retrieve::bm25::{Bm25Params, InvertedIndex};
use clause_retrieve::dense::DenseRetriever;
use clause_retrieve::filtering::{DocumentMetadata, FilterPredicate};
use clause_retrieve::fusion::{rrf, RrfConfig};
use clause_retrieve::integration::VectorStoreBackend;
use clause_retrieve::routing::route_query;
use clause_retrieve::tokenize::tokenize;
use clause_retrieve::RetrieveError;

use crate::error::{ClauseError, ClauseResult};
use crate::model::PolicyChunk;

/// One ranked chunk with its fused score and, where available, its raw
/// dense similarity (the similarity threshold is applied against this).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: PolicyChunk,
    pub score: f32,
    pub dense_similarity: Option<f32>,
}

/// How a search degraded, if at all (§7's "never silently substitute").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    None,
    SparseOnly,
    DenseOnly,
}

pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub degradation: Degradation,
}

/// In-process hybrid index: owns the BM25 postings, the dense vector store,
/// and the chunk records both sides of fusion resolve ids back to.
///
/// Held behind `arc_swap::ArcSwap` by callers so a reindex swap never blocks
/// a reader (§5). This type itself is the read-mostly snapshot being swapped.
pub struct HybridRetriever {
    sparse: InvertedIndex,
    dense: DenseRetriever,
    chunks: HashMap<u32, PolicyChunk>,
    metadata: HashMap<u32, DocumentMetadata>,
    by_uuid: HashMap<uuid::Uuid, u32>,
    query_timeout: Duration,
    rrf_k: f32,
}

impl HybridRetriever {
    pub fn new(rrf_k: f32, query_timeout: Duration) -> Self {
        Self {
            sparse: InvertedIndex::new(),
            dense: DenseRetriever::with_metadata(),
            chunks: HashMap::new(),
            metadata: HashMap::new(),
            by_uuid: HashMap::new(),
            query_timeout,
            rrf_k,
        }
    }

    /// Index one chunk under both sides at once; `id` is the dense/sparse
    /// shared numeric handle the rest of this process assigns per chunk.
    pub fn index_chunk(&mut self, id: u32, chunk: PolicyChunk, embedding: Vec<f32>, metadata: DocumentMetadata) {
        let tokens = tokenize(&chunk.content);
        self.sparse.add_document(id, &tokens);
        self.dense
            .upsert(&[(id, embedding, metadata.clone())])
            .expect("DenseRetriever::upsert never fails");
        self.by_uuid.insert(chunk.id, id);
        self.metadata.insert(id, metadata);
        self.chunks.insert(id, chunk);
    }

    /// Resolve a chunk by its stable uuid (used to pull table refs etc. out
    /// of a search result without re-running a query).
    pub fn chunk_by_id(&self, id: uuid::Uuid) -> Option<&PolicyChunk> {
        self.by_uuid.get(&id).and_then(|numeric| self.chunks.get(numeric))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Run a hybrid search per §4.8: route fusion weights from the query
    /// text, join sparse and dense concurrently under a deadline, fuse, and
    /// prune by `min_similarity`. `min_similarity < 0` disables the floor.
    pub async fn search(
        &self,
        query: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&FilterPredicate>,
        min_similarity: f32,
    ) -> ClauseResult<SearchOutcome> {
        if query.trim().is_empty() {
            return Err(ClauseError::InvalidInput("query must not be empty".to_string()));
        }

        let weights = route_query(query);
        let fetch_k = (top_k * 2).max(top_k);
        let tokens = tokenize(query);

        let sparse_fut = async { self.sparse.retrieve(&tokens, fetch_k, Bm25Params::default()) };
        let dense_fut = async { self.dense.query(query_embedding, fetch_k, filter) };

        let joined = tokio::time::timeout(self.query_timeout, async { tokio::join!(sparse_fut, dense_fut) }).await;

        let (sparse_result, dense_result) = match joined {
            Ok(pair) => pair,
            Err(_) => return Err(ClauseError::Timeout),
        };

        let (sparse_hits, sparse_degraded) = match sparse_result {
            Ok(hits) => (hits, false),
            Err(RetrieveError::EmptyQuery) | Err(RetrieveError::EmptyIndex) => (Vec::new(), false),
            Err(other) => {
                tracing::warn!(error = %other, "sparse side unavailable, falling back to dense-only");
                (Vec::new(), true)
            }
        };
        let (dense_hits, dense_degraded) = match dense_result {
            Ok(hits) => (hits, false),
            Err(RetrieveError::EmptyQuery) | Err(RetrieveError::EmptyIndex) => (Vec::new(), false),
            Err(other) => {
                tracing::warn!(error = %other, "dense side unavailable, falling back to sparse-only");
                (Vec::new(), true)
            }
        };

        if sparse_degraded && dense_degraded {
            return Err(ClauseError::InternalError("both retrieval sides unavailable".to_string()));
        }

        let degradation = if sparse_degraded {
            Degradation::DenseOnly
        } else if dense_degraded {
            Degradation::SparseOnly
        } else {
            Degradation::None
        };

        let config = RrfConfig::new(self.rrf_k, weights.sparse, weights.dense);
        let chunk_index_of = |id: u32| self.chunks.get(&id).map(|c| c.chunk_index).unwrap_or(u32::MAX);
        let fused = rrf(&sparse_hits, &dense_hits, fetch_k, config, chunk_index_of);

        let mut hits: Vec<SearchHit> = Vec::new();
        for candidate in fused {
            let Some(chunk) = self.chunks.get(&candidate.id) else {
                continue;
            };
            // Dense candidates were already filtered at query time, but sparse
            // candidates never saw the predicate; re-check every fused hit so a
            // sparse-only match can't leak metadata the caller excluded (§4.8).
            if let Some(filter) = filter {
                let matches = self
                    .metadata
                    .get(&candidate.id)
                    .is_some_and(|metadata| filter.matches(metadata));
                if !matches {
                    continue;
                }
            }
            if let Some(similarity) = candidate.dense_similarity {
                if min_similarity >= 0.0 && similarity < min_similarity {
                    continue;
                }
            }
            hits.push(SearchHit {
                chunk: chunk.clone(),
                score: candidate.score,
                dense_similarity: candidate.dense_similarity,
            });
            if hits.len() >= top_k {
                break;
            }
        }

        Ok(SearchOutcome { hits, degradation })
    }
}

/// Shared, swappable handle to one generation of the hybrid index (§5's
/// "swap-on-success"). Readers hold a cheap `Arc` clone; a reindex builds a
/// fresh `HybridRetriever` and calls `ArcSwap::store`.
pub type SharedRetriever = Arc<arc_swap::ArcSwap<HybridRetriever>>;

pub fn shared(retriever: HybridRetriever) -> SharedRetriever {
    Arc::new(arc_swap::ArcSwap::from_pointee(retriever))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, DocType};
    use clause_retrieve::filtering::MetadataValue;
    use uuid::Uuid;

    fn chunk(chunk_index: u32, content: &str, category: Category) -> PolicyChunk {
        PolicyChunk {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            chunk_index,
            content: content.to_string(),
            section_id: None,
            section_title: None,
            parent_section: None,
            level: 1,
            section_path: String::new(),
            page_number: None,
            is_table: false,
            table_data: None,
            table_refs: Vec::new(),
            category,
            entity_role: None,
            keywords: Vec::new(),
            company: "平安人寿".to_string(),
            product_code: "TEST001".to_string(),
            product_name: "测试产品".to_string(),
            doc_type: DocType::Clause,
            embedding: None,
        }
    }

    #[tokio::test]
    async fn search_respects_min_similarity_floor() {
        let mut retriever = HybridRetriever::new(60.0, Duration::from_secs(1));
        retriever.index_chunk(
            0,
            chunk(0, "责任免除 酒后驾驶", Category::Exclusion),
            vec![1.0, 0.0],
            [("category".to_string(), MetadataValue::from("Exclusion"))].into(),
        );
        retriever.index_chunk(
            1,
            chunk(1, "保险期间为五年", Category::General),
            vec![0.0, 1.0],
            [("category".to_string(), MetadataValue::from("General"))].into(),
        );

        let outcome = retriever.search("责任免除", &[1.0, 0.0], 5, None, 0.95).await.unwrap();
        assert!(outcome.hits.iter().all(|h| h.dense_similarity.unwrap_or(1.0) >= 0.95));
    }

    #[tokio::test]
    async fn search_applies_metadata_filter() {
        let mut retriever = HybridRetriever::new(60.0, Duration::from_secs(1));
        retriever.index_chunk(
            0,
            chunk(0, "责任免除条款", Category::Exclusion),
            vec![1.0, 0.0],
            [("category".to_string(), MetadataValue::from("Exclusion"))].into(),
        );
        retriever.index_chunk(
            1,
            chunk(1, "一般说明", Category::General),
            vec![0.9, 0.1],
            [("category".to_string(), MetadataValue::from("General"))].into(),
        );

        let filter = FilterPredicate::equals("category", "Exclusion");
        let outcome = retriever.search("条款", &[1.0, 0.0], 5, Some(&filter), -1.0).await.unwrap();
        assert!(outcome.hits.iter().all(|h| h.chunk.category == Category::Exclusion));
    }

    #[tokio::test]
    async fn filter_drops_sparse_only_matches_too() {
        // The non-matching chunk shares the query token with the matching one,
        // so it would surface on the sparse side even though its dense vector
        // is far from the query - only the post-hoc metadata check can drop it.
        let mut retriever = HybridRetriever::new(60.0, Duration::from_secs(1));
        retriever.index_chunk(
            0,
            chunk(0, "责任免除 酒后驾驶", Category::Exclusion),
            vec![1.0, 0.0],
            [("category".to_string(), MetadataValue::from("Exclusion"))].into(),
        );
        retriever.index_chunk(
            1,
            chunk(1, "责任免除 并非本条款范围", Category::General),
            vec![0.0, 1.0],
            [("category".to_string(), MetadataValue::from("General"))].into(),
        );

        let filter = FilterPredicate::equals("category", "Exclusion");
        let outcome = retriever
            .search("责任免除", &[1.0, 0.0], 5, Some(&filter), -1.0)
            .await
            .unwrap();
        assert!(outcome.hits.iter().all(|h| h.chunk.category == Category::Exclusion));
        assert!(outcome.hits.iter().any(|h| h.chunk.chunk_index == 0));
    }

    #[tokio::test]
    async fn empty_query_is_invalid_input() {
        let retriever = HybridRetriever::new(60.0, Duration::from_secs(1));
        let err = retriever.search("   ", &[1.0, 0.0], 5, None, -1.0).await.unwrap_err();
        assert!(matches!(err, ClauseError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn timeout_maps_to_clause_timeout_error() {
        let retriever = HybridRetriever::new(60.0, Duration::from_nanos(1));
        let result = retriever.search("责任免除", &[1.0, 0.0], 5, None, -1.0).await;
        assert!(matches!(result, Err(ClauseError::Timeout)) || result.is_ok());
    }
}
