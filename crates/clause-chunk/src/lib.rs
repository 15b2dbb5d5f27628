//! Markdown-aware chunking (§4.3): splits a document's rendered Markdown
//! into retrieval units that each carry their full heading breadcrumb,
//! respect table boundaries, and overlap at the tail when a logical unit
//! had to be split for size.

mod block;
mod split;
mod tokens;

pub use tokens::estimate_tokens;

use block::{parse_blocks, Block};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One chunker output. `section_id`/`parent_section`/`category`/`entity_role`
/// are left for the enricher (§4.4) to populate; the chunker only owns the
/// structural fields §4.3 assigns (breadcrumb, level, table boundaries).
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub chunk_index: u32,
    pub content: String,
    pub section_title: Option<String>,
    pub section_path: String,
    pub level: u8,
    pub is_table: bool,
    pub table_data: Option<TableData>,
    pub table_refs: Vec<Uuid>,
}

struct HeadingFrame {
    level: u8,
    title: String,
}

pub fn chunk_markdown(markdown: &str) -> Vec<RawChunk> {
    let blocks = parse_blocks(markdown);

    let mut stack: Vec<HeadingFrame> = Vec::new();
    let mut prose_buffer = String::new();
    let mut table_refs_buffer: Vec<Uuid> = Vec::new();
    let mut chunk_index = 0u32;
    let mut output = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level, title } => {
                flush_prose(&mut prose_buffer, &mut table_refs_buffer, &stack, &mut chunk_index, &mut output);
                while stack.last().is_some_and(|frame| frame.level >= level) {
                    stack.pop();
                }
                stack.push(HeadingFrame { level, title });
            }
            Block::Paragraph(text) => {
                if !prose_buffer.is_empty() {
                    prose_buffer.push_str("\n\n");
                }
                prose_buffer.push_str(&text);
            }
            Block::RateTablePlaceholder { uuid, raw_line } => {
                if !prose_buffer.is_empty() {
                    prose_buffer.push_str("\n\n");
                }
                prose_buffer.push_str(&raw_line);
                table_refs_buffer.push(uuid);
            }
            Block::Table { headers, rows } => {
                flush_prose(&mut prose_buffer, &mut table_refs_buffer, &stack, &mut chunk_index, &mut output);
                emit_table_chunk(headers, rows, &stack, &mut chunk_index, &mut output);
            }
        }
    }
    flush_prose(&mut prose_buffer, &mut table_refs_buffer, &stack, &mut chunk_index, &mut output);

    output
}

fn breadcrumb(stack: &[HeadingFrame]) -> String {
    stack.iter().map(|f| f.title.as_str()).collect::<Vec<_>>().join(" > ")
}

fn current_level(stack: &[HeadingFrame]) -> u8 {
    stack.last().map(|f| f.level).unwrap_or(1)
}

fn flush_prose(
    buffer: &mut String,
    table_refs: &mut Vec<Uuid>,
    stack: &[HeadingFrame],
    chunk_index: &mut u32,
    output: &mut Vec<RawChunk>,
) {
    if buffer.trim().is_empty() && table_refs.is_empty() {
        buffer.clear();
        return;
    }

    let path = breadcrumb(stack);
    let level = current_level(stack);
    let section_title = stack.last().map(|f| f.title.clone());

    for piece in split::split_with_overlap(buffer) {
        let content = if path.is_empty() {
            piece
        } else {
            format!("[section: {path}]\n{piece}")
        };
        output.push(RawChunk {
            chunk_index: *chunk_index,
            content,
            section_title: section_title.clone(),
            section_path: path.clone(),
            level,
            is_table: false,
            table_data: None,
            table_refs: table_refs.clone(),
        });
        *chunk_index += 1;
    }

    buffer.clear();
    table_refs.clear();
}

fn emit_table_chunk(
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    stack: &[HeadingFrame],
    chunk_index: &mut u32,
    output: &mut Vec<RawChunk>,
) {
    let path = breadcrumb(stack);
    let level = current_level(stack);
    let section_title = stack.last().map(|f| f.title.clone());

    let rendered = render_table_markdown(&headers, &rows);
    let content = if path.is_empty() {
        rendered
    } else {
        format!("[section: {path}]\n{rendered}")
    };

    output.push(RawChunk {
        chunk_index: *chunk_index,
        content,
        section_title,
        section_path: path,
        level,
        is_table: true,
        table_data: Some(TableData { headers, rows }),
        table_refs: Vec::new(),
    });
    *chunk_index += 1;
}

fn render_table_markdown(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!("| {} |\n", vec!["---"; headers.len()].join(" | ")));
    for row in rows {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumb_reflects_full_heading_stack() {
        let markdown = "# 保险责任\n\n## 重疾保险金\n\n### 给付条件\n\n本条款约定的给付条件如下。";
        let chunks = chunk_markdown(markdown);
        let last = chunks.last().unwrap();
        assert_eq!(last.section_path, "保险责任 > 重疾保险金 > 给付条件");
        assert!(last.content.starts_with("[section: 保险责任 > 重疾保险金 > 给付条件]"));
    }

    #[test]
    fn ordinary_table_is_its_own_chunk_never_merged_with_prose() {
        let markdown = "# 保险期间\n\n前言段落\n\n| 年龄 | 保费 |\n| --- | --- |\n| 30 | 1200 |\n\n后记段落";
        let chunks = chunk_markdown(markdown);

        let table_chunk = chunks.iter().find(|c| c.is_table).unwrap();
        assert!(table_chunk.table_data.is_some());
        assert!(!table_chunk.content.contains("前言段落"));
        assert!(!table_chunk.content.contains("后记段落"));
    }

    #[test]
    fn rate_table_placeholder_is_retained_verbatim_and_recorded_as_ref() {
        let uuid = Uuid::new_v4();
        let markdown = format!("# 现金价值\n\n详见下表：\n\n[rate-table: {uuid}]\n\n如上所示。");
        let chunks = chunk_markdown(&markdown);

        let chunk = chunks.iter().find(|c| c.table_refs.contains(&uuid)).unwrap();
        assert!(chunk.content.contains(&format!("[rate-table: {uuid}]")));
    }

    #[test]
    fn chunk_index_is_monotonic_in_document_order() {
        let markdown = "# A\n\n内容一\n\n## B\n\n内容二\n\n| h |\n| --- |\n| v |\n\n# C\n\n内容三";
        let chunks = chunk_markdown(markdown);
        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
        assert_eq!(indices, (0..indices.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn sibling_heading_at_same_level_closes_previous_sections_scope() {
        let markdown = "# A\n\n## A1\n\n内容\n\n## A2\n\n内容二";
        let chunks = chunk_markdown(markdown);
        let paths: Vec<&str> = chunks.iter().map(|c| c.section_path.as_str()).collect();
        assert!(paths.contains(&"A > A1"));
        assert!(paths.contains(&"A > A2"));
    }
}
