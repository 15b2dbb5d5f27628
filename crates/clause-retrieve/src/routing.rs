//! Query-adaptive fusion weight routing (§4.8).
//!
//! Decides how much to trust the sparse (BM25) side versus the dense side
//! of a hybrid query before running RRF fusion. The decision is a small,
//! deterministic rule cascade over the raw query string - no trained
//! model, no query embedding required.

/// Fusion weights for one query: how much each side's rank contributes to
/// the RRF score (§4.8's `w_i`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteWeights {
    pub sparse: f32,
    pub dense: f32,
}

impl RouteWeights {
    pub const NUMERIC: Self = Self {
        sparse: 0.8,
        dense: 0.2,
    };
    pub const QUESTION: Self = Self {
        sparse: 0.2,
        dense: 0.8,
    };
    pub const DEFAULT: Self = Self {
        sparse: 0.4,
        dense: 0.6,
    };
}

const QUESTION_MARKERS: [&str; 9] = [
    "如何", "怎么", "什么", "为什么", "哪", "多少", "吗", "呢", "？",
];

/// Route a raw query string to fusion weights per §4.8:
/// - a dotted-numeric section pattern or >=2 digit tokens -> sparse-heavy
/// - a question-like query -> dense-heavy
/// - otherwise -> the default split
pub fn route_query(query: &str) -> RouteWeights {
    if has_section_pattern(query) || count_digit_tokens(query) >= 2 {
        return RouteWeights::NUMERIC;
    }
    if is_question(query) {
        return RouteWeights::QUESTION;
    }
    RouteWeights::DEFAULT
}

/// Matches a dotted-numeric clause reference such as "1.2" or "1.2.1".
fn has_section_pattern(query: &str) -> bool {
    let chars: Vec<char> = query.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let mut j = i;
            let mut dots = 0;
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                if chars[j] == '.' {
                    dots += 1;
                }
                j += 1;
            }
            // require at least one digit after the final dot, i.e. "1." alone doesn't count
            if dots >= 1 && chars[j - 1].is_ascii_digit() {
                return true;
            }
            i = j.max(i + 1);
        } else {
            i += 1;
        }
    }
    false
}

/// Counts maximal runs of ASCII digits as one "digit token" each.
fn count_digit_tokens(query: &str) -> usize {
    let mut count = 0;
    let mut in_token = false;
    for ch in query.chars() {
        if ch.is_ascii_digit() {
            if !in_token {
                count += 1;
                in_token = true;
            }
        } else {
            in_token = false;
        }
    }
    count
}

fn is_question(query: &str) -> bool {
    query.contains('?') || QUESTION_MARKERS.iter().any(|m| query.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_section_reference_to_sparse_heavy() {
        assert_eq!(route_query("1.2.1"), RouteWeights::NUMERIC);
        assert_eq!(route_query("请看条款1.2"), RouteWeights::NUMERIC);
    }

    #[test]
    fn routes_two_digit_tokens_to_sparse_heavy() {
        assert_eq!(route_query("保额50万赔付30天"), RouteWeights::NUMERIC);
    }

    #[test]
    fn routes_question_to_dense_heavy() {
        assert_eq!(route_query("这个保险保多久？"), RouteWeights::QUESTION);
        assert_eq!(route_query("如何办理理赔"), RouteWeights::QUESTION);
    }

    #[test]
    fn routes_plain_text_to_default() {
        assert_eq!(route_query("责任免除条款"), RouteWeights::DEFAULT);
    }

    #[test]
    fn single_digit_token_is_not_numeric_route() {
        assert_eq!(route_query("我今年5岁"), RouteWeights::DEFAULT);
    }
}
