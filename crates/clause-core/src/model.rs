//! The data model of §3: Product, PolicyDocument, RateTable, PolicyChunk.
//!
//! These are plain records; none of the invariants in §3 are enforced by
//! the type system alone (e.g. "chunk_index is unique per document" is a
//! property of the metadata store, not of `PolicyChunk` itself) - see
//! `metadata_store` for where they're checked.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub product_code: String,
    pub name: String,
    pub company: String,
    pub category: String,
    pub publish_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DocType {
    Clause,
    Manual,
    RateTable,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clause => "clause",
            Self::Manual => "manual",
            Self::RateTable => "rate-table",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDocument {
    pub id: Uuid,
    pub product_id: Uuid,
    pub doc_type: DocType,
    pub filename: String,
    pub local_path: String,
    pub source_url: String,
    pub file_hash: String,
    pub file_size: u64,
    pub downloaded_at: chrono::DateTime<chrono::Utc>,
    pub verification_status: VerificationStatus,
    pub reviewer_notes: Option<String>,
}

impl PolicyDocument {
    /// §3 invariant 4: only VERIFIED documents may be indexed.
    pub fn is_indexable(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// PENDING -> VERIFIED/REJECTED, REJECTED -> PENDING on resubmission.
    /// VERIFIED is terminal for indexing purposes (§4's state machine).
    pub fn transition(&mut self, next: VerificationStatus) -> Result<(), String> {
        use VerificationStatus::*;
        let allowed = matches!(
            (self.verification_status, next),
            (Pending, Verified) | (Pending, Rejected) | (Rejected, Pending)
        );
        if !allowed {
            return Err(format!(
                "illegal verification transition {:?} -> {:?}",
                self.verification_status, next
            ));
        }
        self.verification_status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    Rate,
    Benefit,
    Ordinary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateTable {
    pub uuid: Uuid,
    pub document_id: Uuid,
    pub page_range: (u32, u32),
    pub headers: Vec<String>,
    pub row_count: usize,
    pub col_count: usize,
    pub csv_path: String,
    pub product_code: String,
    pub table_type: TableType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    Liability,
    Exclusion,
    Process,
    Definition,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liability => "Liability",
            Self::Exclusion => "Exclusion",
            Self::Process => "Process",
            Self::Definition => "Definition",
            Self::General => "General",
        }
    }

    /// Conversion from the enrichment crate's own `Category` - the two
    /// enums are kept separate (clause-enrich has no dependency on
    /// clause-core) but share the same variant set by §3/§4.4 construction.
    pub fn from_enrich(category: clause_enrich::Category) -> Self {
        match category {
            clause_enrich::Category::Liability => Self::Liability,
            clause_enrich::Category::Exclusion => Self::Exclusion,
            clause_enrich::Category::Process => Self::Process,
            clause_enrich::Category::Definition => Self::Definition,
            clause_enrich::Category::General => Self::General,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum EntityRole {
    Insurer,
    Insured,
    Beneficiary,
}

impl EntityRole {
    pub fn from_enrich(role: clause_enrich::EntityRole) -> Self {
        match role {
            clause_enrich::EntityRole::Insurer => Self::Insurer,
            clause_enrich::EntityRole::Insured => Self::Insured,
            clause_enrich::EntityRole::Beneficiary => Self::Beneficiary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The retrieval unit (§3). `embedding` is populated by the pipeline after
/// enrichment and is not serialized into the relational store - it lives in
/// the vector store keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: u32,

    pub content: String,

    pub company: String,
    pub product_code: String,
    pub product_name: String,
    pub doc_type: DocType,

    pub section_id: Option<String>,
    pub section_title: Option<String>,
    pub parent_section: Option<String>,
    pub level: u8,
    pub section_path: String,
    pub page_number: Option<u32>,

    pub category: Category,
    pub entity_role: Option<EntityRole>,
    pub keywords: Vec<String>,

    pub is_table: bool,
    pub table_data: Option<TableData>,
    pub table_refs: Vec<Uuid>,

    #[serde(skip_serializing, skip_deserializing)]
    pub embedding: Option<Vec<f32>>,
}

impl PolicyChunk {
    /// §3 invariant 2: textual XOR preserved-inline-table, never both.
    pub fn is_well_formed(&self) -> bool {
        let textual_and_tabular = self.is_table && self.table_data.is_none();
        let nontable_with_table_data = !self.is_table && self.table_data.is_some();
        !textual_and_tabular && !nontable_with_table_data && self.level >= 1 && self.level <= 5
    }

    /// Deterministic id: a function of (document_id, chunk_index) per §8's
    /// reindex-idempotence law, not a fresh random uuid per rebuild.
    pub fn derive_id(document_id: Uuid, chunk_index: u32) -> Uuid {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_bytes());
        hasher.update(chunk_index.to_le_bytes());
        let digest = hasher.finalize();
        Uuid::from_slice(&digest[..16]).expect("sha256 digest has at least 16 bytes")
    }
}
