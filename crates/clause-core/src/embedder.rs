//! The Embedder contract (§4.5): deterministic text -> fixed-dim vector.
//!
//! This workspace carries no ML runtime dependency, so the default
//! implementation is a feature-hashing embedder: deterministic, pure, and
//! enough to exercise the rest of the pipeline end to end. A real deployment
//! swaps in a local sentence-transformer (e.g. via an ONNX Runtime binding)
//! behind the same trait; `model_id`/`dimension` are what the stored index
//! checks queries against to refuse a mismatched model (§7 IndexMismatch).

pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Deterministic feature-hashing embedder over the shared CJK/Latin
/// tokenizer: each token hashes into a fixed-size bucket vector, L2
/// normalized so dot product gives cosine similarity.
pub struct HashingEmbedder {
    model_id: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { model_id: format!("hashing-embedder-{dimension}d"), dimension }
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in clause_retrieve::tokenize::tokenize(text) {
            let bucket = hash_token(&token) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

fn hash_token(token: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_embeds_identically() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(embedder.embed("责任免除"), embedder.embed("责任免除"));
    }

    #[test]
    fn embedding_is_l2_normalized() {
        let embedder = HashingEmbedder::new(64);
        let vector = embedder.embed("保险责任条款内容");
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn different_text_usually_embeds_differently() {
        let embedder = HashingEmbedder::new(64);
        assert_ne!(embedder.embed("责任免除"), embedder.embed("犹豫期退保"));
    }
}
