//! Keyword extraction (§4.4): top-k by in-chunk term frequency, domain nouns
//! weighted up, after tokenizing with the same segmenter the sparse index
//! uses ([`clause_retrieve::tokenize`]).

use clause_retrieve::tokenize::tokenize;
use std::collections::HashMap;

const DEFAULT_TOP_K: usize = 5;

/// Domain nouns that should rank above generic terms of equal frequency.
const DOMAIN_NOUN_BOOST: &[&str] = &[
    "保险金", "保费", "现金价值", "责任免除", "受益人", "被保险人", "保险期间", "犹豫期", "退保", "减额交清",
];

pub fn extract(content: &str) -> Vec<String> {
    extract_top_k(content, DEFAULT_TOP_K)
}

pub fn extract_top_k(content: &str, k: usize) -> Vec<String> {
    let tokens = tokenize(content);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in &tokens {
        if token.chars().count() < 2 {
            continue;
        }
        *counts.entry(token.clone()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize, bool)> = counts
        .into_iter()
        .map(|(term, count)| {
            let boosted = DOMAIN_NOUN_BOOST.contains(&term.as_str());
            (term, count, boosted)
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.2.cmp(&a.2) // domain nouns first
            .then_with(|| b.1.cmp(&a.1)) // then by frequency
            .then_with(|| a.0.cmp(&b.0)) // deterministic tiebreak
    });

    ranked.into_iter().take(k).map(|(term, _, _)| term).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_noun_ranks_above_equal_frequency_generic_term() {
        let content = "保险金保险金其他其他";
        let keywords = extract_top_k(content, 1);
        assert_eq!(keywords, vec!["保险金"]);
    }

    #[test]
    fn returns_at_most_k_keywords() {
        let content = "责任免除责任免除免除除外除外保费保费本公司本公司";
        let keywords = extract_top_k(content, 2);
        assert_eq!(keywords.len(), 2);
    }

    #[test]
    fn empty_content_yields_no_keywords() {
        assert!(extract("").is_empty());
    }
}
