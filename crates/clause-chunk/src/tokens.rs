//! Token estimation (§4.3): 1 token ~= 1.5 Chinese characters. This is an
//! estimator for sizing decisions, not a tokenizer shared with the sparse
//! index - BM25 tokenization is a separate concern (`clause_retrieve::bm25`).

const CHARS_PER_TOKEN: f32 = 1.5;

pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    ((chars as f32) / CHARS_PER_TOKEN).ceil() as usize
}
