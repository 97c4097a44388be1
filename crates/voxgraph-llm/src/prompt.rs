// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt construction for extraction, translation, and feedback summaries.

use voxgraph_core::types::{GraphEntity, GraphRelation};
use voxgraph_graph::similarity::normalize_label;

/// Maximum existing entities included as prompt context.
pub const MAX_CONTEXT_ENTITIES: usize = 8;

/// Maximum existing relations included as prompt context.
pub const MAX_CONTEXT_RELATIONS: usize = 5;

/// Selects the most relevant graph context for an extraction prompt.
///
/// Entities whose normalized label occurs in the input text come first;
/// remaining slots are filled by most-recently-updated entities. Relations
/// are kept only when at least one endpoint made the cut.
pub fn select_context<'a>(
    entities: &'a [GraphEntity],
    relations: &'a [GraphRelation],
    text: &str,
) -> (Vec<&'a GraphEntity>, Vec<&'a GraphRelation>) {
    let normalized_text = normalize_label(text);

    let mut selected: Vec<&GraphEntity> = Vec::new();
    for entity in entities {
        if selected.len() >= MAX_CONTEXT_ENTITIES {
            break;
        }
        let normalized = normalize_label(&entity.label);
        if !normalized.is_empty() && normalized_text.contains(&normalized) {
            selected.push(entity);
        }
    }

    if selected.len() < MAX_CONTEXT_ENTITIES {
        let mut remaining: Vec<&GraphEntity> = entities
            .iter()
            .filter(|e| !selected.iter().any(|s| s.id == e.id))
            .collect();
        remaining.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        for entity in remaining {
            if selected.len() >= MAX_CONTEXT_ENTITIES {
                break;
            }
            selected.push(entity);
        }
    }

    let selected_relations: Vec<&GraphRelation> = relations
        .iter()
        .filter(|r| {
            selected
                .iter()
                .any(|e| e.id == r.source || e.id == r.target)
        })
        .take(MAX_CONTEXT_RELATIONS)
        .collect();

    (selected, selected_relations)
}

/// Builds the extraction prompt for one sentence batch.
pub fn build_extraction_prompt(
    text: &str,
    existing_entities: &[GraphEntity],
    existing_relations: &[GraphRelation],
    guidance: Option<&str>,
) -> String {
    let mut prompt = String::from(
        "You are an expert knowledge graph builder.\n\
         Extract entities and relationships from the given text.\n\n\
         ## Entity Types\n\
         - PERSON: People, names\n\
         - ORGANIZATION: Organizations, companies, institutions\n\
         - LOCATION: Places, regions, countries, cities\n\
         - CONCEPT: Abstract concepts, theories, ideas\n\
         - EVENT: Events, incidents, occurrences\n\
         - PRODUCT: Products, services, offerings\n\
         - TECHNOLOGY: Technologies, tools, frameworks, programming languages\n\
         - DATE: Dates, times, periods\n\
         - METRIC: Numbers, metrics, statistics, measurements\n\
         - ACTION: Actions, activities, verbs\n\n\
         ## CRITICAL RULES\n\
         1. Extract ONLY explicitly mentioned entities.\n\
         2. Each entity must have a UNIQUE ID (e.g., e1, e2).\n\
         3. Relations describe semantic connections between entities.\n\
         4. Relation descriptions should be concise verbs or phrases.\n\
         5. Do NOT extract vague or uncertain relations.\n\
         6. Extract the MOST IMPORTANT 3-5 entities maximum.\n\
         7. Extract 1-3 key relations maximum.\n\
         8. Support multiple languages (Korean, English, Japanese, Chinese, etc.)\n\n\
         ## DUPLICATE PREVENTION\n\
         1. If an entity is semantically identical to an existing one, REUSE the existing ID.\n\
         2. Synonyms, abbreviations, and aliases are the SAME entity.\n\
         3. Do NOT create duplicate relations (same source-target pair).\n",
    );

    if let Some(guidance) = guidance {
        prompt.push_str("\n## FEEDBACK-BASED IMPROVEMENTS\n");
        prompt.push_str("Based on user feedback from previous sessions, please note:\n");
        prompt.push_str(guidance);
        prompt.push('\n');
    }

    let (entities, relations) = select_context(existing_entities, existing_relations, text);

    if !entities.is_empty() {
        prompt.push_str("\n## Existing Entities (reuse these IDs if applicable)\n");
        for e in &entities {
            prompt.push_str(&format!(
                "- ID: {}, Label: \"{}\", Type: {}\n",
                e.id, e.label, e.entity_type
            ));
        }
    }

    if !relations.is_empty() {
        prompt.push_str("\n## Existing Relations (avoid duplicates)\n");
        for r in &relations {
            prompt.push_str(&format!("- {} --[{}]--> {}\n", r.source, r.relation, r.target));
        }
    }

    prompt.push_str(
        "\n## Output Format\n\
         Return ONLY valid JSON in this exact format:\n\n\
         ```json\n\
         {\n\
         \x20 \"entities\": [\n\
         \x20   { \"id\": \"e1\", \"label\": \"Entity Name\", \"type\": \"ENTITY_TYPE\" }\n\
         \x20 ],\n\
         \x20 \"relations\": [\n\
         \x20   { \"source\": \"e1\", \"target\": \"e2\", \"relation\": \"relationship description\" }\n\
         \x20 ]\n\
         }\n\
         ```\n\n\
         If no entities or relations found, return:\n\
         ```json\n\
         { \"entities\": [], \"relations\": [] }\n\
         ```\n\n\
         ## Example\n\
         Input: \"김철수는 삼성전자에서 일한다.\"\n\
         Output:\n\
         ```json\n\
         {\n\
         \x20 \"entities\": [\n\
         \x20   { \"id\": \"e1\", \"label\": \"김철수\", \"type\": \"PERSON\" },\n\
         \x20   { \"id\": \"e2\", \"label\": \"삼성전자\", \"type\": \"ORGANIZATION\" }\n\
         \x20 ],\n\
         \x20 \"relations\": [\n\
         \x20   { \"source\": \"e1\", \"target\": \"e2\", \"relation\": \"직장\" }\n\
         \x20 ]\n\
         }\n\
         ```\n\n\
         ## Text to analyze:\n",
    );
    prompt.push_str(&format!("\"\"\"\n{text}\n\"\"\""));

    prompt
}

/// Builds the prompt that translates all graph labels into a target language.
pub fn build_translation_prompt(
    entities: &[GraphEntity],
    relations: &[GraphRelation],
    target_language: &str,
) -> String {
    let mut prompt = format!(
        "Translate the following knowledge graph labels into \"{target_language}\".\n\
         Keep ids unchanged. Translate entity labels and relation phrases only.\n\
         Return ONLY valid JSON in this exact format:\n\n\
         ```json\n\
         {{\n\
         \x20 \"entities\": [ {{ \"id\": \"...\", \"label\": \"translated\" }} ],\n\
         \x20 \"relations\": [ {{ \"id\": \"...\", \"relation\": \"translated\" }} ]\n\
         }}\n\
         ```\n\n\
         ## Entities\n"
    );
    for e in entities {
        prompt.push_str(&format!("- id: {}, label: \"{}\"\n", e.id, e.label));
    }
    prompt.push_str("\n## Relations\n");
    for r in relations {
        prompt.push_str(&format!("- id: {}, relation: \"{}\"\n", r.id, r.relation));
    }
    prompt
}

/// Builds the prompt that condenses user feedback into extraction guidance.
pub fn build_feedback_summary_prompt(feedback_lines: &[String]) -> String {
    format!(
        "Analyze the following user feedback about knowledge graph extraction\n\
         and provide concise improvement guidelines for future extractions.\n\n\
         User Feedback:\n{}\n\n\
         Provide 2-3 specific, actionable guidelines based on the feedback patterns.\n\
         Focus on what users found helpful or unhelpful.\n\
         Keep the response under 200 words.\n",
        feedback_lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgraph_core::types::EntityType;

    fn entity(id: &str, label: &str, updated_at: i64) -> GraphEntity {
        GraphEntity {
            id: id.to_string(),
            label: label.to_string(),
            entity_type: EntityType::Concept,
            created_at: 0,
            updated_at,
            metadata: None,
        }
    }

    fn relation(source: &str, target: &str) -> GraphRelation {
        GraphRelation {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            relation: "related to".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn text_matched_entities_come_first() {
        let entities = vec![
            entity("a", "Kubernetes", 1),
            entity("b", "Rust", 100),
            entity("c", "Tokio", 50),
        ];
        let (selected, _) =
            select_context(&entities, &[], "We deployed Tokio services on Kubernetes");
        assert_eq!(selected[0].id, "a");
        assert_eq!(selected[1].id, "c");
        // Remaining slot filled by recency.
        assert_eq!(selected[2].id, "b");
    }

    #[test]
    fn context_entities_are_capped() {
        let entities: Vec<GraphEntity> = (0..20)
            .map(|i| entity(&format!("id-{i}"), &format!("Label {i}"), i as i64))
            .collect();
        let (selected, _) = select_context(&entities, &[], "unrelated text");
        assert_eq!(selected.len(), MAX_CONTEXT_ENTITIES);
        // Recency order: highest updated_at first.
        assert_eq!(selected[0].id, "id-19");
    }

    #[test]
    fn relations_require_selected_endpoint() {
        let entities = vec![entity("a", "Alpha", 2), entity("b", "Beta", 1)];
        let relations = vec![relation("a", "b"), relation("x", "y")];
        let (_, selected_relations) = select_context(&entities, &relations, "");
        assert_eq!(selected_relations.len(), 1);
        assert_eq!(selected_relations[0].source, "a");
    }

    #[test]
    fn relations_are_capped() {
        let entities = vec![entity("a", "Alpha", 1)];
        let relations: Vec<GraphRelation> =
            (0..10).map(|i| relation("a", &format!("t{i}"))).collect();
        let (_, selected) = select_context(&entities, &relations, "");
        assert_eq!(selected.len(), MAX_CONTEXT_RELATIONS);
    }

    #[test]
    fn extraction_prompt_includes_context_and_text() {
        let entities = vec![entity("a", "Samsung Electronics", 1)];
        let prompt = build_extraction_prompt(
            "삼성전자 실적 발표",
            &entities,
            &[],
            Some("Prefer specific entity labels."),
        );
        assert!(prompt.contains("## Entity Types"));
        assert!(prompt.contains("Samsung Electronics"));
        assert!(prompt.contains("FEEDBACK-BASED IMPROVEMENTS"));
        assert!(prompt.contains("Prefer specific entity labels."));
        assert!(prompt.contains("삼성전자 실적 발표"));
    }

    #[test]
    fn extraction_prompt_omits_empty_sections() {
        let prompt = build_extraction_prompt("hello", &[], &[], None);
        assert!(!prompt.contains("Existing Entities"));
        assert!(!prompt.contains("Existing Relations"));
        assert!(!prompt.contains("FEEDBACK-BASED"));
    }

    #[test]
    fn translation_prompt_lists_every_label() {
        let entities = vec![entity("a", "김철수", 0)];
        let relations = vec![relation("a", "b")];
        let prompt = build_translation_prompt(&entities, &relations, "en");
        assert!(prompt.contains("김철수"));
        assert!(prompt.contains("related to"));
        assert!(prompt.contains("\"en\""));
    }
}
