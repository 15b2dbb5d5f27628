//! Tokenization shared by the sparse index and, via `clause-enrich`, keyword
//! extraction. No ecosystem crate in this workspace's corpus provides
//! dictionary-based Chinese word segmentation (a jieba equivalent); this
//! follows the CJK bigram approach Elasticsearch's built-in `cjk` analyzer
//! uses instead - overlapping 2-character grams for CJK runs, whitespace/
//! punctuation splitting for everything else. It costs precision relative to
//! a real segmenter but needs no external dictionary and is symmetric at
//! index and query time, which is the contract §4.7 actually requires.

/// Short stop list applied symmetrically at index and query time (§4.7).
const STOPWORDS: &[&str] = &["的", "了", "和", "是", "在", "及", "或", "与", "the", "a", "an", "of", "and", "or"];

pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run = String::new();
    let mut run_is_cjk = false;

    let flush = |run: &mut String, run_is_cjk: bool, tokens: &mut Vec<String>| {
        if run.is_empty() {
            return;
        }
        if run_is_cjk {
            tokens.extend(bigrams(run));
        } else {
            tokens.extend(
                run.split(|c: char| c.is_whitespace() || is_ascii_punctuation(c))
                    .filter(|w| !w.is_empty())
                    .map(|w| w.to_lowercase()),
            );
        }
        run.clear();
    };

    for ch in text.chars() {
        if ch.is_whitespace() {
            flush(&mut run, run_is_cjk, &mut tokens);
            continue;
        }
        let cjk = is_cjk(ch);
        if !run.is_empty() && cjk != run_is_cjk {
            flush(&mut run, run_is_cjk, &mut tokens);
        }
        run_is_cjk = cjk;
        run.push(ch);
    }
    flush(&mut run, run_is_cjk, &mut tokens);

    tokens.retain(|t| !STOPWORDS.contains(&t.as_str()) && !t.is_empty());
    tokens
}

fn bigrams(run: &str) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    if chars.len() <= 1 {
        return vec![run.to_string()];
    }
    chars.windows(2).map(|w| w.iter().collect()).collect()
}

fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0x3400..=0x4DBF // CJK Extension A
        | 0xF900..=0xFAFF // CJK Compatibility Ideographs
    )
}

fn is_ascii_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '，' | '。' | '、' | '；' | '：' | '？' | '！' | '（' | '）')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cjk_run_becomes_overlapping_bigrams() {
        let tokens = tokenize("责任免除");
        assert_eq!(tokens, vec!["责任", "任免", "免除"]);
    }

    #[test]
    fn latin_run_splits_on_whitespace_and_lowercases() {
        let tokens = tokenize("Cash Value");
        assert_eq!(tokens, vec!["cash", "value"]);
    }

    #[test]
    fn stopwords_are_dropped() {
        let tokens = tokenize("保险的责任");
        assert!(!tokens.contains(&"的".to_string()));
    }

    #[test]
    fn mixed_script_text_tokenizes_each_run_independently() {
        let tokens = tokenize("FY001保单");
        assert!(tokens.contains(&"fy001".to_string()));
        assert!(tokens.iter().any(|t| t.contains('保')));
    }
}
