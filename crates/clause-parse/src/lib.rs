//! Structured PDF parsing (§4.2): PDF -> ordered [`Element`]s, rate tables
//! split off to sidecar CSVs, the remainder rendered to Markdown with
//! placeholders where rate tables were removed.

pub mod element;
pub mod error;
pub mod markdown;
pub mod pdf;
pub mod reading_order;
pub mod table;

pub use element::Element;
pub use error::{ParseError, ParseResult};
pub use table::{RateTableRecord, TableClass};

use std::collections::HashMap;
use std::path::Path;

/// The three outputs of §4.2: the Markdown rendering, any rate tables that
/// were split out (in page order), and the element count for bookkeeping.
pub struct ParsedDocument {
    pub markdown: String,
    pub rate_tables: Vec<RateTableRecord>,
    pub element_count: usize,
}

/// Parse a verified PDF end-to-end: extract elements, classify tables,
/// export rate tables to `export_dir`, and render the remainder to Markdown.
pub fn parse_document(
    path: impl AsRef<Path>,
    export_dir: &Path,
    product_code: &str,
) -> ParseResult<ParsedDocument> {
    let elements = pdf::parse_pdf(&path)?;
    let source_pdf = path.as_ref().to_string_lossy().into_owned();

    let mut rate_table_uuids = HashMap::new();
    let mut rate_tables = Vec::new();

    for (index, element) in elements.iter().enumerate() {
        if let Element::Table { headers, rows, page } = element {
            if table::classify(headers, rows) == TableClass::Rate {
                let record = table::export_rate_table(
                    export_dir,
                    headers,
                    rows,
                    &source_pdf,
                    (*page, *page),
                    product_code,
                )?;
                rate_table_uuids.insert(index, record.uuid);
                rate_tables.push(record);
            }
        }
    }

    let markdown = markdown::render(&elements, &rate_table_uuids);

    Ok(ParsedDocument {
        markdown,
        rate_tables,
        element_count: elements.len(),
    })
}
