//! Markdown rendering (§4.2): headings map to `#`..`#####`, ordinary tables
//! render as GitHub-flavored Markdown tables, rate tables are replaced by a
//! `[rate-table: {uuid}]` placeholder, figures are dropped with a comment.

use crate::element::Element;
use std::collections::HashMap;
use uuid::Uuid;

/// `rate_table_uuids` maps the index of a `Table` element in `elements` to
/// the uuid assigned when it was classified and exported as a rate table.
/// Tables absent from the map render inline as ordinary Markdown tables.
pub fn render(elements: &[Element], rate_table_uuids: &HashMap<usize, Uuid>) -> String {
    let mut out = String::new();

    for (index, element) in elements.iter().enumerate() {
        match element {
            Element::Heading { level, text } => {
                let hashes = "#".repeat((*level).clamp(1, 5) as usize);
                out.push_str(&format!("{hashes} {text}\n\n"));
            }
            Element::Paragraph { text } => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            Element::Table { headers, rows, .. } => {
                if let Some(uuid) = rate_table_uuids.get(&index) {
                    out.push_str(&format!("[rate-table: {uuid}]\n\n"));
                } else {
                    out.push_str(&render_gfm_table(headers, rows));
                    out.push('\n');
                }
            }
            Element::Figure { caption } => {
                out.push_str(&format!("<!-- figure dropped: {caption} -->\n\n"));
            }
        }
    }

    out
}

fn render_gfm_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&headers.join(" | "));
    out.push_str(" |\n");
    out.push_str("| ");
    out.push_str(&vec!["---"; headers.len()].join(" | "));
    out.push_str(" |\n");
    for row in rows {
        out.push_str("| ");
        out.push_str(&row.join(" | "));
        out.push_str(" |\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels_map_to_correct_hash_count() {
        let elements = vec![Element::Heading { level: 3, text: "保险责任".to_string() }];
        let rendered = render(&elements, &HashMap::new());
        assert!(rendered.starts_with("### 保险责任"));
    }

    #[test]
    fn rate_table_renders_as_placeholder() {
        let elements = vec![Element::Table {
            headers: vec!["年龄".to_string()],
            rows: vec![vec!["30".to_string()]],
            page: 1,
        }];
        let uuid = Uuid::new_v4();
        let mut map = HashMap::new();
        map.insert(0, uuid);

        let rendered = render(&elements, &map);
        assert_eq!(rendered.trim(), format!("[rate-table: {uuid}]"));
    }

    #[test]
    fn ordinary_table_renders_as_gfm() {
        let elements = vec![Element::Table {
            headers: vec!["条款".to_string(), "说明".to_string()],
            rows: vec![vec!["1.4".to_string(), "保险期间".to_string()]],
            page: 1,
        }];
        let rendered = render(&elements, &HashMap::new());
        assert!(rendered.contains("| 条款 | 说明 |"));
        assert!(rendered.contains("| 1.4 | 保险期间 |"));
    }

    #[test]
    fn figure_is_dropped_with_comment_marker() {
        let elements = vec![Element::Figure { caption: "示意图".to_string() }];
        let rendered = render(&elements, &HashMap::new());
        assert!(rendered.contains("<!--"));
        assert!(rendered.contains("示意图"));
    }
}
