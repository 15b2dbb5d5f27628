//! Rate-table classification and sidecar export (§4.2).

use crate::error::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use uuid::Uuid;

const RATE_HEADER_TOKENS: &[&str] = &[
    "age", "年龄", "premium", "保费", "rate", "费率", "cash value", "现金价值", "benefit", "利益",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Rate,
    Ordinary,
}

/// §4.2's classification rule: header-keyword match with a moderate numeric
/// ratio, or an overwhelming numeric ratio regardless of headers.
pub fn classify(headers: &[String], rows: &[Vec<String>]) -> TableClass {
    let numeric_ratio = numeric_cell_ratio(rows);
    let has_rate_headers = headers.iter().any(|h| {
        let lower = h.to_lowercase();
        RATE_HEADER_TOKENS.iter().any(|token| lower.contains(token) || h.contains(token))
    });

    if (has_rate_headers && numeric_ratio > 0.5) || numeric_ratio > 0.8 {
        TableClass::Rate
    } else {
        TableClass::Ordinary
    }
}

fn numeric_cell_ratio(rows: &[Vec<String>]) -> f32 {
    let mut total = 0usize;
    let mut numeric = 0usize;
    for row in rows {
        for cell in row {
            total += 1;
            if is_numeric_cell(cell) {
                numeric += 1;
            }
        }
    }
    if total == 0 {
        return 0.0;
    }
    numeric as f32 / total as f32
}

fn is_numeric_cell(cell: &str) -> bool {
    let trimmed = cell.trim().trim_end_matches('%').trim_end_matches('元').replace(',', "");
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// One record in `{export_dir}/metadata.json` (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTableRecord {
    pub uuid: Uuid,
    pub source_pdf: String,
    pub page_range: (u32, u32),
    pub product_code: String,
    pub table_type: String,
    pub csv_path: String,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub col_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Flatten nested header rows by parent-label concatenation (§4.2): a header
/// under a merged parent cell becomes `"{parent}{separator}{child}"`.
pub fn flatten_headers(header_rows: &[Vec<String>], separator: &str) -> Vec<String> {
    if header_rows.len() <= 1 {
        return header_rows.first().cloned().unwrap_or_default();
    }
    let width = header_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            header_rows
                .iter()
                .filter_map(|row| row.get(col))
                .filter(|cell| !cell.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect()
}

/// Write a rate table's rows to `{export_dir}/{uuid}.csv` and append its
/// record to `{export_dir}/metadata.json`, atomically (write temp + rename).
pub fn export_rate_table(
    export_dir: &Path,
    headers: &[String],
    rows: &[Vec<String>],
    source_pdf: &str,
    page_range: (u32, u32),
    product_code: &str,
) -> ParseResult<RateTableRecord> {
    std::fs::create_dir_all(export_dir)?;
    let uuid = Uuid::new_v4();
    let csv_path = export_dir.join(format!("{uuid}.csv"));

    write_csv(&csv_path, headers, rows)?;

    let record = RateTableRecord {
        uuid,
        source_pdf: source_pdf.to_string(),
        page_range,
        product_code: product_code.to_string(),
        table_type: "rate".to_string(),
        csv_path: csv_path.to_string_lossy().into_owned(),
        headers: headers.to_vec(),
        row_count: rows.len(),
        col_count: headers.len(),
        created_at: chrono::Utc::now(),
    };

    append_metadata_record(&export_dir.join("metadata.json"), &record)?;
    Ok(record)
}

fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> ParseResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn append_metadata_record(path: &Path, record: &RateTableRecord) -> ParseResult<()> {
    let mut records: Vec<RateTableRecord> = if path.exists() {
        let mut contents = String::new();
        std::fs::File::open(path)?.read_to_string(&mut contents)?;
        serde_json::from_str(&contents)
            .map_err(|e| ParseError::MetadataWrite(format!("corrupt metadata.json: {e}")))?
    } else {
        Vec::new()
    };
    records.push(record.clone());

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut tmp = std::fs::File::create(&tmp_path)?;
        let serialized = serde_json::to_string_pretty(&records)
            .map_err(|e| ParseError::MetadataWrite(e.to_string()))?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_age_premium_table_with_moderate_numeric_ratio_as_rate() {
        let headers = vec!["年龄".to_string(), "保费".to_string()];
        let rows = vec![
            vec!["30".to_string(), "1200".to_string()],
            vec!["40".to_string(), "1500".to_string()],
        ];
        assert_eq!(classify(&headers, &rows), TableClass::Rate);
    }

    #[test]
    fn classifies_overwhelmingly_numeric_table_as_rate_without_keyword_headers() {
        let headers = vec!["col1".to_string(), "col2".to_string()];
        let rows = vec![
            vec!["1".to_string(), "2".to_string()],
            vec!["3".to_string(), "4".to_string()],
        ];
        assert_eq!(classify(&headers, &rows), TableClass::Rate);
    }

    #[test]
    fn classifies_mostly_textual_table_as_ordinary() {
        let headers = vec!["条款".to_string(), "说明".to_string()];
        let rows = vec![vec!["责任免除".to_string(), "酒后驾驶导致的意外".to_string()]];
        assert_eq!(classify(&headers, &rows), TableClass::Ordinary);
    }

    #[test]
    fn flattens_two_row_nested_headers() {
        let header_rows = vec![
            vec!["年龄".to_string(), "现金价值".to_string(), "".to_string()],
            vec!["".to_string(), "第1年".to_string(), "第2年".to_string()],
        ];
        let flattened = flatten_headers(&header_rows, " - ");
        assert_eq!(flattened, vec!["年龄", "现金价值 - 第1年", "第2年"]);
    }

    #[test]
    fn csv_round_trips_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["年龄".to_string(), "保费".to_string()];
        let rows = vec![vec!["30".to_string(), "1200".to_string()]];

        let record = export_rate_table(dir.path(), &headers, &rows, "clause.pdf", (3, 4), "FY001").unwrap();

        let mut reader = csv::Reader::from_path(&record.csv_path).unwrap();
        let read_headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(read_headers, headers);

        let read_rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(read_rows, rows);
    }

    #[test]
    fn metadata_json_accumulates_across_multiple_exports() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["年龄".to_string()];
        export_rate_table(dir.path(), &headers, &[vec!["30".to_string()]], "a.pdf", (1, 1), "FY001").unwrap();
        export_rate_table(dir.path(), &headers, &[vec!["40".to_string()]], "b.pdf", (2, 2), "FY002").unwrap();

        let contents = std::fs::read_to_string(dir.path().join("metadata.json")).unwrap();
        let records: Vec<RateTableRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(records.len(), 2);
    }
}
