//! Section id parsing (§4.4): a leading dotted-numeric pattern on the
//! deepest heading; `parent_section` is that id minus its last segment.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)*)").expect("static pattern is valid"))
}

pub fn parse(heading_text: &str) -> Option<String> {
    pattern()
        .captures(heading_text.trim())
        .map(|captures| captures[1].to_string())
}

pub fn parent_of(section_id: &str) -> Option<String> {
    let mut segments: Vec<&str> = section_id.split('.').collect();
    if segments.len() <= 1 {
        return None;
    }
    segments.pop();
    Some(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_segment_section_id() {
        assert_eq!(parse("1.2.6 身故保险金"), Some("1.2.6".to_string()));
    }

    #[test]
    fn parses_single_segment_section_id() {
        assert_eq!(parse("1 总则"), Some("1".to_string()));
    }

    #[test]
    fn heading_without_numbering_has_no_section_id() {
        assert_eq!(parse("释义"), None);
    }

    #[test]
    fn parent_section_drops_last_segment() {
        assert_eq!(parent_of("1.2.6"), Some("1.2".to_string()));
        assert_eq!(parent_of("1"), None);
    }
}
