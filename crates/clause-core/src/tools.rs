//! The 4-tool surface (§4.9). Each function here is transport-agnostic: the
//! MCP adapter in `clause-mcp` calls straight through to these and
//! JSON-serializes the result. None of these ever synthesize content - an
//! empty `Vec` is as valid a response as a populated one.

use std::collections::HashMap;
use std::sync::OnceLock;

use clause_retrieve::filtering::FilterPredicate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClauseError, ClauseResult};
use crate::metadata_store::MetadataStore;
use crate::model::{Category, DocType};
use crate::retriever::HybridRetriever;

const EXCLUSION_DISCLAIMER: &str =
    "本结果仅供参考，不构成理赔责任认定；具体以保险公司审核结论为准。";

/// Every surfaced chunk's provenance pointer (§7's "enough to cite").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceReference {
    pub product_name: String,
    pub document_type: String,
    pub document_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClauseMatch {
    pub chunk_id: Uuid,
    pub content: String,
    pub section_id: Option<String>,
    pub section_title: Option<String>,
    pub similarity_score: Option<f32>,
    pub source_reference: SourceReference,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub company: Option<String>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub doc_type: Option<DocType>,
    pub category: Option<Category>,
}

impl SearchFilters {
    fn to_predicate(&self) -> Option<FilterPredicate> {
        let mut predicates = Vec::new();
        if let Some(company) = &self.company {
            predicates.push(FilterPredicate::equals("company", company.as_str()));
        }
        if let Some(product_code) = &self.product_code {
            predicates.push(FilterPredicate::equals("product_code", product_code.as_str()));
        }
        if let Some(product_name) = &self.product_name {
            predicates.push(FilterPredicate::equals("product_name", product_name.as_str()));
        }
        if let Some(doc_type) = &self.doc_type {
            predicates.push(FilterPredicate::equals("doc_type", doc_type.as_str()));
        }
        if let Some(category) = &self.category {
            predicates.push(FilterPredicate::equals("category", category.as_str()));
        }
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(FilterPredicate::And(predicates)),
        }
    }
}

/// §4.9 `search_policy_clause`. `min_similarity < 0` disables the floor.
pub async fn search_policy_clause(
    retriever: &HybridRetriever,
    embedder: &dyn crate::embedder::Embedder,
    query: &str,
    filters: SearchFilters,
    top_k: usize,
    min_similarity: f32,
) -> ClauseResult<Vec<ClauseMatch>> {
    let embedding = embedder.embed(query);
    let predicate = filters.to_predicate();
    let outcome = retriever
        .search(query, &embedding, top_k, predicate.as_ref(), min_similarity)
        .await?;

    Ok(outcome
        .hits
        .into_iter()
        .map(|hit| ClauseMatch {
            chunk_id: hit.chunk.id,
            content: hit.chunk.content.clone(),
            section_id: hit.chunk.section_id.clone(),
            section_title: hit.chunk.section_title.clone(),
            similarity_score: hit.dense_similarity,
            source_reference: SourceReference {
                product_name: hit.chunk.product_name.clone(),
                document_type: hit.chunk.doc_type.as_str().to_string(),
                document_reference: format!("{}#chunk-{}", hit.chunk.document_id, hit.chunk.chunk_index),
            },
        })
        .collect())
}

/// Scenario keyword expansion map (§4.9): a curated, hand-maintained table
/// from common lay phrasings to the clause vocabulary they typically map to.
fn scenario_expansion() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static MAP: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        map.insert("酒驾", &["酒后驾驶", "饮酒", "醉酒", "酒精"]);
        map.insert("醉驾", &["酒后驾驶", "饮酒", "醉酒", "酒精"]);
        map.insert("无证驾驶", &["无证驾驶", "未取得驾驶资格", "驾驶证"]);
        map.insert("自杀", &["自杀", "自伤"]);
        map.insert("高风险运动", &["高风险运动", "潜水", "攀岩", "跳伞"]);
        map
    })
}

fn expand_scenario(scenario_description: &str) -> String {
    let mut expanded = scenario_description.to_string();
    for (trigger, synonyms) in scenario_expansion() {
        if scenario_description.contains(trigger) {
            expanded.push(' ');
            expanded.push_str(&synonyms.join(" "));
        }
    }
    expanded
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExclusionRiskResult {
    pub risk_detected: bool,
    pub relevant_clauses: Vec<ClauseMatch>,
    pub summary: String,
    pub disclaimer: String,
}

const EXCLUSION_MIN_SIMILARITY: f32 = 0.75;

/// §4.9 `check_exclusion_risk`.
pub async fn check_exclusion_risk(
    retriever: &HybridRetriever,
    embedder: &dyn crate::embedder::Embedder,
    scenario_description: &str,
    product_code: Option<String>,
    strict: bool,
) -> ClauseResult<ExclusionRiskResult> {
    let expanded_query = expand_scenario(scenario_description);
    let floor = if strict { EXCLUSION_MIN_SIMILARITY } else { 0.0 };
    let filters = SearchFilters {
        product_code,
        category: Some(Category::Exclusion),
        ..Default::default()
    };

    let relevant_clauses = search_policy_clause(retriever, embedder, &expanded_query, filters, 10, -1.0).await?;

    let risk_detected = relevant_clauses
        .iter()
        .any(|c| c.similarity_score.map(|s| s >= floor).unwrap_or(false));

    let summary = if relevant_clauses.is_empty() {
        "未检索到与该情形相关的除外责任条款。".to_string()
    } else if risk_detected {
        format!("检索到 {} 条可能相关的除外责任条款，存在不予理赔的风险。", relevant_clauses.len())
    } else {
        "检索到相关条款，但相似度未达到风险判定阈值，建议人工复核。".to_string()
    };

    Ok(ExclusionRiskResult {
        risk_detected,
        relevant_clauses,
        summary,
        disclaimer: EXCLUSION_DISCLAIMER.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurrenderOperation {
    Surrender,
    ReducedPaidUp,
}

impl SurrenderOperation {
    fn name(self) -> &'static str {
        match self {
            Self::Surrender => "退保",
            Self::ReducedPaidUp => "减额交清",
        }
    }

    fn query_text(self) -> &'static str {
        match self {
            Self::Surrender => "退保现金价值计算",
            Self::ReducedPaidUp => "减额交清办理流程",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurrenderValueLogic {
    pub operation_name: String,
    pub definition: String,
    pub calculation_rules: Vec<String>,
    pub conditions: Vec<String>,
    pub consequences: Vec<String>,
    pub related_tables: Vec<Uuid>,
    pub comparison_note: String,
    pub source_references: Vec<SourceReference>,
}

const CONSULT_SCHEDULE_NOTE: &str = "本产品未检索到现金价值表，具体数值请以保险单所附保险单明细或保险公司出具的现金价值表为准。";

/// §4.9 `calculate_surrender_value_logic`. `policy_year` narrows nothing in
/// this rule-based form (no numeric reasoning over rate tables per the
/// Non-goals) - it is accepted and echoed for the caller's context only.
pub async fn calculate_surrender_value_logic(
    retriever: &HybridRetriever,
    embedder: &dyn crate::embedder::Embedder,
    product_code: &str,
    _policy_year: Option<u32>,
    operation: SurrenderOperation,
) -> ClauseResult<SurrenderValueLogic> {
    let filters = SearchFilters {
        product_code: Some(product_code.to_string()),
        category: Some(Category::Process),
        ..Default::default()
    };
    let matches = search_policy_clause(retriever, embedder, operation.query_text(), filters, 5, -1.0).await?;

    if matches.is_empty() {
        return Err(ClauseError::NotFound(format!(
            "no Process-category clauses found for product_code {product_code}"
        )));
    }

    let definition = matches
        .first()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    let related_tables: Vec<Uuid> = matches
        .iter()
        .flat_map(|m| table_refs_of(retriever, m.chunk_id))
        .collect();

    let mut calculation_rules: Vec<String> = matches.iter().skip(1).map(|m| m.content.clone()).collect();
    if related_tables.is_empty() {
        calculation_rules.push(CONSULT_SCHEDULE_NOTE.to_string());
    }

    let comparison_note = format!(
        "{} 与其他现金价值处置方式相比，在保障水平、资金可得性与合同终止条件上存在差异，请结合自身需求选择。",
        operation.name()
    );

    Ok(SurrenderValueLogic {
        operation_name: operation.name().to_string(),
        definition,
        calculation_rules,
        conditions: matches.iter().map(|m| m.section_title.clone().unwrap_or_default()).collect(),
        consequences: Vec::new(),
        related_tables,
        comparison_note,
        source_references: matches.iter().map(|m| m.source_reference.clone()).collect(),
    })
}

fn table_refs_of(retriever: &HybridRetriever, chunk_id: Uuid) -> Vec<Uuid> {
    retriever
        .chunk_by_id(chunk_id)
        .map(|chunk| chunk.table_refs.clone())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub company: String,
    pub category: String,
    pub publish_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// §4.9 `lookup_product`. Never touches the vector index.
pub fn lookup_product(
    store: &MetadataStore,
    product_name: &str,
    company: Option<&str>,
    top_k: usize,
) -> ClauseResult<Vec<ProductInfo>> {
    let mut products = store.search_products_by_name(product_name, company)?;
    products.truncate(top_k);

    Ok(products
        .into_iter()
        .map(|p| ProductInfo {
            product_id: p.id,
            product_code: p.product_code,
            product_name: p.name,
            company: p.company,
            category: p.category,
            publish_time: p.publish_time,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_expansion_adds_known_synonyms() {
        let expanded = expand_scenario("酒驾出事怎么办");
        assert!(expanded.contains("酒后驾驶"));
        assert!(expanded.contains("醉酒"));
    }

    #[test]
    fn unmatched_scenario_is_left_unexpanded() {
        let expanded = expand_scenario("普通投保咨询");
        assert_eq!(expanded.trim(), "普通投保咨询");
    }

    #[test]
    fn surrender_operation_names_are_distinct() {
        assert_ne!(SurrenderOperation::Surrender.name(), SurrenderOperation::ReducedPaidUp.name());
    }
}
