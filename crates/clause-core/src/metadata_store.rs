//! The relational store for Product/PolicyDocument records (§6: `{root}/db/metadata.db`).
//! Schema plumbing is out of scope per §1 - this module only guarantees the
//! fields named in §3 round-trip; it does not attempt a general ORM.

use crate::error::ClauseResult;
use crate::model::{DocType, PolicyDocument, Product, VerificationStatus};
use rusqlite::{params, Connection};
use std::path::Path;
use uuid::Uuid;

pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    pub fn open(path: impl AsRef<Path>) -> ClauseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::error::ClauseError::InternalError(format!("creating metadata db dir: {e}"))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> ClauseResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn migrate(conn: &Connection) -> ClauseResult<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                product_code TEXT NOT NULL,
                name TEXT NOT NULL,
                company TEXT NOT NULL,
                category TEXT NOT NULL,
                publish_time TEXT,
                UNIQUE(company, product_code)
            );
            CREATE TABLE IF NOT EXISTS policy_documents (
                id TEXT PRIMARY KEY,
                product_id TEXT NOT NULL REFERENCES products(id),
                doc_type TEXT NOT NULL,
                filename TEXT NOT NULL,
                local_path TEXT NOT NULL,
                source_url TEXT NOT NULL,
                file_hash TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                downloaded_at TEXT NOT NULL,
                verification_status TEXT NOT NULL,
                reviewer_notes TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Products are created on first discovery and never mutated by the
    /// core (§3) - this is an insert-or-ignore, not an upsert.
    pub fn insert_product_if_absent(&self, product: &Product) -> ClauseResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO products (id, product_code, name, company, category, publish_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.id.to_string(),
                product.product_code,
                product.name,
                product.company,
                product.category,
                product.publish_time.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn find_product_by_code(&self, company: &str, product_code: &str) -> ClauseResult<Option<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_code, name, company, category, publish_time
             FROM products WHERE company = ?1 AND product_code = ?2",
        )?;
        let mut rows = stmt.query(params![company, product_code])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_product(row)?)),
            None => Ok(None),
        }
    }

    pub fn find_product_by_id(&self, id: Uuid) -> ClauseResult<Option<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_code, name, company, category, publish_time
             FROM products WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_product(row)?)),
            None => Ok(None),
        }
    }

    pub fn search_products_by_name(&self, query: &str, company: Option<&str>) -> ClauseResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_code, name, company, category, publish_time FROM products",
        )?;
        let rows = stmt.query_map([], |row| row_to_product_raw(row))?;
        let mut scored: Vec<(f32, Product)> = Vec::new();
        for row in rows {
            let product = row?;
            if let Some(c) = company {
                if product.company != c {
                    continue;
                }
            }
            if let Some(similarity) = name_similarity(&product.name, query) {
                scored.push((similarity, product));
            }
        }
        // Highest name-similarity first, per the "top result is the closest
        // match" guarantee `lookup_product` surfaces.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().map(|(_, product)| product).collect())
    }

    pub fn insert_document(&self, doc: &PolicyDocument) -> ClauseResult<()> {
        self.conn.execute(
            "INSERT INTO policy_documents
                (id, product_id, doc_type, filename, local_path, source_url, file_hash,
                 file_size, downloaded_at, verification_status, reviewer_notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                doc.id.to_string(),
                doc.product_id.to_string(),
                doc_type_str(doc.doc_type),
                doc.filename,
                doc.local_path,
                doc.source_url,
                doc.file_hash,
                doc.file_size,
                doc.downloaded_at.to_rfc3339(),
                verification_status_str(doc.verification_status),
                doc.reviewer_notes,
            ],
        )?;
        Ok(())
    }

    pub fn update_verification_status(
        &self,
        document_id: Uuid,
        status: VerificationStatus,
        reviewer_notes: Option<&str>,
    ) -> ClauseResult<()> {
        self.conn.execute(
            "UPDATE policy_documents SET verification_status = ?1, reviewer_notes = ?2 WHERE id = ?3",
            params![
                verification_status_str(status),
                reviewer_notes,
                document_id.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn verified_documents(&self) -> ClauseResult<Vec<PolicyDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_id, doc_type, filename, local_path, source_url, file_hash,
                    file_size, downloaded_at, verification_status, reviewer_notes
             FROM policy_documents WHERE verification_status = 'VERIFIED'",
        )?;
        let rows = stmt.query_map([], row_to_document)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

fn doc_type_str(t: DocType) -> &'static str {
    match t {
        DocType::Clause => "clause",
        DocType::Manual => "manual",
        DocType::RateTable => "rate-table",
    }
}

fn verification_status_str(s: VerificationStatus) -> &'static str {
    match s {
        VerificationStatus::Pending => "PENDING",
        VerificationStatus::Verified => "VERIFIED",
        VerificationStatus::Rejected => "REJECTED",
    }
}

fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    row_to_product_raw(row)
}

fn row_to_product_raw(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    let id: String = row.get(0)?;
    let publish_time: Option<String> = row.get(5)?;
    Ok(Product {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        product_code: row.get(1)?,
        name: row.get(2)?,
        company: row.get(3)?,
        category: row.get(4)?,
        publish_time: publish_time.and_then(|t| chrono::DateTime::parse_from_rfc3339(&t).ok()).map(|t| t.with_timezone(&chrono::Utc)),
    })
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<PolicyDocument> {
    let id: String = row.get(0)?;
    let product_id: String = row.get(1)?;
    let doc_type: String = row.get(2)?;
    let downloaded_at: String = row.get(8)?;
    let verification_status: String = row.get(9)?;

    Ok(PolicyDocument {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        product_id: Uuid::parse_str(&product_id).unwrap_or_default(),
        doc_type: match doc_type.as_str() {
            "manual" => DocType::Manual,
            "rate-table" => DocType::RateTable,
            _ => DocType::Clause,
        },
        filename: row.get(3)?,
        local_path: row.get(4)?,
        source_url: row.get(5)?,
        file_hash: row.get(6)?,
        file_size: row.get(7)?,
        downloaded_at: chrono::DateTime::parse_from_rfc3339(&downloaded_at)
            .map(|t| t.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        verification_status: match verification_status.as_str() {
            "VERIFIED" => VerificationStatus::Verified,
            "REJECTED" => VerificationStatus::Rejected,
            _ => VerificationStatus::Pending,
        },
        reviewer_notes: row.get(10)?,
    })
}

/// Normalized-edit-distance fuzzy match used by `lookup_product` (§4.9).
/// Returns `None` when neither a substring match nor a close-enough edit
/// distance holds; otherwise a similarity in (0, 1], substring matches
/// always ranking above pure fuzzy matches of the same distance.
fn name_similarity(haystack: &str, needle: &str) -> Option<f32> {
    if needle.is_empty() {
        return Some(1.0);
    }
    if haystack.contains(needle) {
        return Some(1.0);
    }
    let distance = edit_distance(haystack, needle);
    let normalized = distance as f32 / needle.chars().count().max(1) as f32;
    if normalized <= 0.4 {
        Some(1.0 - normalized)
    } else {
        None
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut curr = vec![i + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr.push((prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: Uuid::new_v4(),
            product_code: "FY001".into(),
            name: "福耀年金保险".into(),
            company: "平安人寿".into(),
            category: "life".into(),
            publish_time: None,
        }
    }

    #[test]
    fn insert_and_find_product_round_trips() {
        let store = MetadataStore::open_in_memory().unwrap();
        let product = sample_product();
        store.insert_product_if_absent(&product).unwrap();

        let found = store.find_product_by_code("平安人寿", "FY001").unwrap().unwrap();
        assert_eq!(found.product_code, product.product_code);
    }

    #[test]
    fn insert_product_if_absent_does_not_duplicate() {
        let store = MetadataStore::open_in_memory().unwrap();
        let product = sample_product();
        store.insert_product_if_absent(&product).unwrap();
        store.insert_product_if_absent(&product).unwrap();

        let results = store.search_products_by_name("福耀", None).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn fuzzy_search_matches_substring() {
        let store = MetadataStore::open_in_memory().unwrap();
        store.insert_product_if_absent(&sample_product()).unwrap();

        let results = store.search_products_by_name("福耀", None).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].name.contains("福耀"));
    }

    #[test]
    fn verified_documents_excludes_pending_and_rejected() {
        let store = MetadataStore::open_in_memory().unwrap();
        let product = sample_product();
        store.insert_product_if_absent(&product).unwrap();

        let mut pending_doc = sample_document(product.id);
        pending_doc.verification_status = VerificationStatus::Pending;
        store.insert_document(&pending_doc).unwrap();

        let mut verified_doc = sample_document(product.id);
        verified_doc.id = Uuid::new_v4();
        verified_doc.verification_status = VerificationStatus::Verified;
        store.insert_document(&verified_doc).unwrap();

        let verified = store.verified_documents().unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, verified_doc.id);
    }

    fn sample_document(product_id: Uuid) -> PolicyDocument {
        PolicyDocument {
            id: Uuid::new_v4(),
            product_id,
            doc_type: DocType::Clause,
            filename: "clause.pdf".into(),
            local_path: "/tmp/clause.pdf".into(),
            source_url: "https://example.com/clause.pdf".into(),
            file_hash: "abc123".into(),
            file_size: 1024,
            downloaded_at: chrono::Utc::now(),
            verification_status: VerificationStatus::Pending,
            reviewer_notes: None,
        }
    }
}
