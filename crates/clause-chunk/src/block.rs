//! Parses the Markdown [`clause_parse`] renders back into blocks the
//! chunker can walk: headings, prose paragraphs, ordinary tables, and rate
//! table placeholders.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, title: String },
    Paragraph(String),
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    RateTablePlaceholder { uuid: Uuid, raw_line: String },
}

pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::new();
    let mut paragraph_buffer: Vec<&str> = Vec::new();
    let mut i = 0;

    let flush_paragraph = |buffer: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !buffer.is_empty() {
            let text = buffer.join("\n").trim().to_string();
            if !text.is_empty() {
                blocks.push(Block::Paragraph(text));
            }
            buffer.clear();
        }
    };

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if let Some(heading) = parse_heading(trimmed) {
            flush_paragraph(&mut paragraph_buffer, &mut blocks);
            blocks.push(heading);
        } else if let Some(placeholder) = parse_rate_table_placeholder(trimmed) {
            flush_paragraph(&mut paragraph_buffer, &mut blocks);
            blocks.push(placeholder);
        } else if is_table_row(trimmed) && lines.get(i + 1).is_some_and(|l| is_table_separator(l.trim())) {
            flush_paragraph(&mut paragraph_buffer, &mut blocks);
            let (table, consumed) = parse_table(&lines[i..]);
            blocks.push(table);
            i += consumed;
            continue;
        } else if trimmed.is_empty() {
            flush_paragraph(&mut paragraph_buffer, &mut blocks);
        } else {
            paragraph_buffer.push(line);
        }

        i += 1;
    }
    flush_paragraph(&mut paragraph_buffer, &mut blocks);

    blocks
}

fn parse_heading(line: &str) -> Option<Block> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 5 {
        return None;
    }
    let rest = line[hashes..].trim();
    if rest.is_empty() {
        return None;
    }
    Some(Block::Heading { level: hashes as u8, title: rest.to_string() })
}

fn parse_rate_table_placeholder(line: &str) -> Option<Block> {
    let inner = line.strip_prefix("[rate-table: ")?.strip_suffix(']')?;
    let uuid = Uuid::parse_str(inner).ok()?;
    Some(Block::RateTablePlaceholder { uuid, raw_line: line.to_string() })
}

fn is_table_row(line: &str) -> bool {
    line.starts_with('|') && line.ends_with('|') && line.len() > 1
}

fn is_table_separator(line: &str) -> bool {
    is_table_row(line) && line.chars().all(|c| matches!(c, '|' | '-' | ' ' | ':'))
}

fn split_row(line: &str) -> Vec<String> {
    line.trim_matches('|').split('|').map(|cell| cell.trim().to_string()).collect()
}

fn parse_table(lines: &[&str]) -> (Block, usize) {
    let headers = split_row(lines[0].trim());
    let mut rows = Vec::new();
    let mut consumed = 2; // header + separator

    for line in &lines[2..] {
        let trimmed = line.trim();
        if !is_table_row(trimmed) {
            break;
        }
        rows.push(split_row(trimmed));
        consumed += 1;
    }

    (Block::Table { headers, rows }, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heading_levels() {
        let blocks = parse_blocks("### 保险期间\n\n正文内容");
        assert_eq!(blocks[0], Block::Heading { level: 3, title: "保险期间".to_string() });
    }

    #[test]
    fn parses_rate_table_placeholder() {
        let uuid = Uuid::new_v4();
        let markdown = format!("[rate-table: {uuid}]");
        let blocks = parse_blocks(&markdown);
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::RateTablePlaceholder { uuid: u, .. } if *u == uuid));
    }

    #[test]
    fn parses_gfm_table_into_headers_and_rows() {
        let markdown = "| 年龄 | 保费 |\n| --- | --- |\n| 30 | 1200 |\n| 40 | 1500 |\n\n后续段落";
        let blocks = parse_blocks(markdown);
        match &blocks[0] {
            Block::Table { headers, rows } => {
                assert_eq!(headers, &vec!["年龄".to_string(), "保费".to_string()]);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("expected table, got {other:?}"),
        }
        assert_eq!(blocks[1], Block::Paragraph("后续段落".to_string()));
    }

    #[test]
    fn merges_consecutive_non_blank_lines_into_one_paragraph() {
        let blocks = parse_blocks("第一行\n第二行\n\n第三段");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block::Paragraph("第一行\n第二行".to_string()));
    }
}
