//! Token-budgeted splitting of an oversized logical unit's prose, with tail
//! overlap between consecutive pieces (§4.3).

use crate::tokens::estimate_tokens;
use text_splitter::{ChunkConfig, MarkdownSplitter};

const TARGET_TOKENS: usize = 750;
const MAX_TOKENS: usize = 2048;
const OVERLAP_MIN_TOKENS: usize = 100;
const OVERLAP_MAX_TOKENS: usize = 200;
/// Inverse of the chunker's char-per-token estimate, to translate a token
/// budget into the character budget `text-splitter` operates on.
const CHARS_PER_TOKEN: usize = 2;

/// Split `text` into pieces near `TARGET_TOKENS`, never exceeding
/// `MAX_TOKENS` except where a single logical unit (e.g. one table row
/// block) can't be split further, then splice ~20% tail overlap between
/// consecutive pieces at a paragraph boundary.
pub fn split_with_overlap(text: &str) -> Vec<String> {
    if estimate_tokens(text) <= MAX_TOKENS {
        return vec![text.to_string()];
    }

    let splitter = MarkdownSplitter::new(ChunkConfig::new(TARGET_TOKENS * CHARS_PER_TOKEN));
    let pieces: Vec<String> = splitter.chunks(text).map(str::to_string).collect();

    splice_overlap(pieces)
}

fn splice_overlap(pieces: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(pieces.len());
    let mut previous: Option<String> = None;

    for piece in pieces {
        match previous.take() {
            Some(prev) => {
                let overlap = tail_overlap(&prev);
                let mut spliced = overlap;
                spliced.push('\n');
                spliced.push_str(&piece);
                out.push(spliced);
            }
            None => out.push(piece.clone()),
        }
        previous = Some(piece);
    }

    out
}

/// The tail 100-200 tokens of `text`, cut at the nearest preceding
/// paragraph boundary so the overlap doesn't start mid-sentence.
fn tail_overlap(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let overlap_chars = (OVERLAP_MAX_TOKENS * CHARS_PER_TOKEN).min(chars.len());
    let min_chars = OVERLAP_MIN_TOKENS * CHARS_PER_TOKEN;
    let start_index = chars.len().saturating_sub(overlap_chars);

    let tail: String = chars[start_index..].iter().collect();
    match tail.find("\n\n") {
        Some(boundary) if boundary < tail.len().saturating_sub(min_chars) => tail[boundary + 2..].to_string(),
        _ => tail,
    }
}
