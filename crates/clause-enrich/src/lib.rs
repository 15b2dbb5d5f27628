//! Metadata enrichment (§4.4): populates category, entity_role, keywords,
//! section_id, and parent_section for a chunk produced by `clause-chunk`.

pub mod category;
pub mod entity_role;
pub mod keywords;
pub mod section_id;

pub use category::Category;
pub use entity_role::EntityRole;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFields {
    pub category: Category,
    pub entity_role: Option<EntityRole>,
    pub keywords: Vec<String>,
    pub section_id: Option<String>,
    pub parent_section: Option<String>,
}

/// Run the full rule cascade over one chunk's content and its deepest
/// heading text (the heading `clause-chunk` recorded as `section_title`).
pub fn enrich(content: &str, section_title: Option<&str>) -> EnrichedFields {
    let section_id = section_title.and_then(section_id::parse);
    let parent_section = section_id.as_deref().and_then(section_id::parent_of);

    EnrichedFields {
        category: category::classify(content),
        entity_role: entity_role::detect(content),
        keywords: keywords::extract(content),
        section_id,
        parent_section,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrich_combines_all_rule_outputs() {
        let content = "本条款约定酒后驾驶导致的意外，我们不承担给付保险金的责任。";
        let fields = enrich(content, Some("2.1.3 酒后驾驶"));

        assert_eq!(fields.category, Category::Exclusion);
        assert_eq!(fields.section_id, Some("2.1.3".to_string()));
        assert_eq!(fields.parent_section, Some("2.1".to_string()));
    }

    #[test]
    fn missing_section_title_yields_no_section_id() {
        let fields = enrich("一般说明文字。", None);
        assert_eq!(fields.section_id, None);
        assert_eq!(fields.parent_section, None);
    }
}
