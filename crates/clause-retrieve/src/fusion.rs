//! Reciprocal Rank Fusion (§4.8).
//!
//! Combines a sparse (BM25) ranked list and a dense (cosine) ranked list
//! into one fused ranking. Naming follows the `rrf`/`rrf_k`/`RrfConfig`
//! convention this workspace's retrieval facade documents for rank
//! fusion, even though the fusion implementation itself is new.

use std::collections::HashMap;

/// RRF configuration. `k` is the rank-discount constant (§4.8 fixes it at 60
/// but exposes it as a knob per §9's open questions).
#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    pub k: f32,
    pub sparse_weight: f32,
    pub dense_weight: f32,
}

impl RrfConfig {
    pub fn new(k: f32, sparse_weight: f32, dense_weight: f32) -> Self {
        Self {
            k,
            sparse_weight,
            dense_weight,
        }
    }
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self {
            k: 60.0,
            sparse_weight: 0.4,
            dense_weight: 0.6,
        }
    }
}

/// One fused candidate: its id, fused RRF score, and (if present) its raw
/// dense similarity - kept around for §4.8's tie-break rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub id: u32,
    pub score: f32,
    pub dense_similarity: Option<f32>,
}

/// Fuse a sparse ranked list (`id, bm25_score`) and a dense ranked list
/// (`id, cosine_similarity`), both already sorted best-first, into one
/// ranking via Reciprocal Rank Fusion, then take the top `k`.
///
/// Ties are broken by higher dense similarity, then by ascending
/// `chunk_index` via `tie_break`: when two fused scores are equal, the
/// caller-supplied `chunk_index` lookup decides final order.
pub fn rrf(
    sparse: &[(u32, f32)],
    dense: &[(u32, f32)],
    k: usize,
    config: RrfConfig,
    chunk_index: impl Fn(u32) -> u32,
) -> Vec<FusedResult> {
    let mut scores: HashMap<u32, f32> = HashMap::new();
    let mut dense_sim: HashMap<u32, f32> = HashMap::new();

    for (rank, (id, _)) in sparse.iter().enumerate() {
        let r = (rank + 1) as f32;
        *scores.entry(*id).or_insert(0.0) += config.sparse_weight / (config.k + r);
    }
    for (rank, (id, sim)) in dense.iter().enumerate() {
        let r = (rank + 1) as f32;
        *scores.entry(*id).or_insert(0.0) += config.dense_weight / (config.k + r);
        dense_sim.insert(*id, *sim);
    }

    let mut fused: Vec<FusedResult> = scores
        .into_iter()
        .map(|(id, score)| FusedResult {
            id,
            score,
            dense_similarity: dense_sim.get(&id).copied(),
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let a_sim = a.dense_similarity.unwrap_or(f32::NEG_INFINITY);
                let b_sim = b.dense_similarity.unwrap_or(f32::NEG_INFINITY);
                b_sim.partial_cmp(&a_sim).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| chunk_index(a.id).cmp(&chunk_index(b.id)))
    });

    fused.truncate(k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_lists_length_is_min_k_and_union() {
        let sparse = vec![(1, 5.0), (2, 4.0), (3, 3.0)];
        let dense = vec![(4, 0.9), (5, 0.8)];
        let result = rrf(&sparse, &dense, 10, RrfConfig::default(), |id| id);
        assert_eq!(result.len(), 5.min(10));
    }

    #[test]
    fn truncates_to_k() {
        let sparse = vec![(1, 5.0), (2, 4.0), (3, 3.0)];
        let dense = vec![];
        let result = rrf(&sparse, &dense, 2, RrfConfig::default(), |id| id);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn increasing_sparse_weight_cannot_lower_rank_of_sparse_only_id() {
        let sparse = vec![(10, 5.0), (20, 4.0)];
        let dense = vec![(30, 0.9), (40, 0.85), (50, 0.8)];

        let low_weight = RrfConfig::new(60.0, 0.1, 0.9);
        let high_weight = RrfConfig::new(60.0, 0.9, 0.1);

        let rank_of = |results: &[FusedResult], id: u32| {
            results.iter().position(|r| r.id == id).unwrap()
        };

        let low = rrf(&sparse, &dense, 10, low_weight, |id| id);
        let high = rrf(&sparse, &dense, 10, high_weight, |id| id);

        assert!(rank_of(&high, 10) <= rank_of(&low, 10));
    }

    #[test]
    fn ties_break_by_dense_similarity_then_chunk_index() {
        let sparse = vec![(1, 5.0), (2, 5.0)];
        let dense = vec![];
        let chunk_index = |id: u32| if id == 1 { 5 } else { 1 };
        let result = rrf(&sparse, &dense, 10, RrfConfig::default(), chunk_index);
        // equal scores, equal (absent) dense similarity -> lower chunk_index wins
        assert_eq!(result[0].id, 2);
    }
}
