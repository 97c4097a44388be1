// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-graph label translation over the generator adapter.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use voxgraph_core::types::{GraphEntity, GraphRelation};
use voxgraph_core::{GenerationConfig, GeneratorAdapter, VoxgraphError};

use crate::prompt::build_translation_prompt;

#[derive(Debug, Deserialize)]
struct TranslationDoc {
    #[serde(default)]
    entities: Vec<TranslatedEntity>,
    #[serde(default)]
    relations: Vec<TranslatedRelation>,
}

#[derive(Debug, Deserialize)]
struct TranslatedEntity {
    id: String,
    label: String,
}

#[derive(Debug, Deserialize)]
struct TranslatedRelation {
    id: String,
    relation: String,
}

/// Translates every entity label and relation phrase into the target
/// language, returning copies with translated text.
///
/// Ids, types, and timestamps are untouched; a label the model omitted keeps
/// its original text.
pub async fn translate_graph(
    generator: &Arc<dyn GeneratorAdapter>,
    entities: &[GraphEntity],
    relations: &[GraphRelation],
    target_language: &str,
) -> Result<(Vec<GraphEntity>, Vec<GraphRelation>), VoxgraphError> {
    let prompt = build_translation_prompt(entities, relations, target_language);
    let response = generator
        .generate(&prompt, &GenerationConfig::summary())
        .await?;

    let doc = parse_translation(&response)?;
    let entity_labels: HashMap<&str, &str> = doc
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.label.as_str()))
        .collect();
    let relation_phrases: HashMap<&str, &str> = doc
        .relations
        .iter()
        .map(|r| (r.id.as_str(), r.relation.as_str()))
        .collect();

    let translated_entities = entities
        .iter()
        .map(|e| {
            let mut entity = e.clone();
            if let Some(label) = entity_labels.get(e.id.as_str()) {
                entity.label = (*label).to_string();
            }
            entity
        })
        .collect();

    let translated_relations = relations
        .iter()
        .map(|r| {
            let mut relation = r.clone();
            if let Some(phrase) = relation_phrases.get(r.id.as_str()) {
                relation.relation = (*phrase).to_string();
            }
            relation
        })
        .collect();

    debug!(
        target_language,
        entities = doc.entities.len(),
        relations = doc.relations.len(),
        "graph translation complete"
    );
    Ok((translated_entities, translated_relations))
}

/// Extracts the JSON document from a possibly fenced response.
fn parse_translation(response: &str) -> Result<TranslationDoc, VoxgraphError> {
    let region = match response.find("```") {
        Some(fence) => {
            let mut start = fence + 3;
            if response[start..].starts_with("json") {
                start += 4;
            }
            let rest = &response[start..];
            match rest.find("```") {
                Some(end) => &rest[..end],
                None => rest,
            }
        }
        None => response,
    };

    let start = region.find('{');
    let end = region.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(VoxgraphError::Generator {
            message: "translation response contained no JSON".into(),
            source: None,
        });
    };

    serde_json::from_str(&region[start..=end]).map_err(|e| VoxgraphError::Generator {
        message: format!("translation response parse failed: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgraph_core::types::EntityType;
    use voxgraph_test_utils::MockGenerator;

    fn entity(id: &str, label: &str) -> GraphEntity {
        GraphEntity {
            id: id.to_string(),
            label: label.to_string(),
            entity_type: EntityType::Person,
            created_at: 1,
            updated_at: 1,
            metadata: None,
        }
    }

    fn relation(id: &str, phrase: &str) -> GraphRelation {
        GraphRelation {
            id: id.to_string(),
            source: "a".to_string(),
            target: "b".to_string(),
            relation: phrase.to_string(),
            created_at: 1,
        }
    }

    #[tokio::test]
    async fn translates_labels_and_phrases() {
        let generator = MockGenerator::new();
        generator
            .push_response(
                "```json\n{\"entities\": [{\"id\": \"a\", \"label\": \"Kim Chulsoo\"}],\n\"relations\": [{\"id\": \"r1\", \"relation\": \"works at\"}]}\n```",
            )
            .await;
        let generator: Arc<dyn GeneratorAdapter> = Arc::new(generator);

        let (entities, relations) = translate_graph(
            &generator,
            &[entity("a", "김철수")],
            &[relation("r1", "직장")],
            "en",
        )
        .await
        .unwrap();

        assert_eq!(entities[0].label, "Kim Chulsoo");
        assert_eq!(relations[0].relation, "works at");
        // Identity is preserved.
        assert_eq!(entities[0].id, "a");
        assert_eq!(entities[0].entity_type, EntityType::Person);
    }

    #[tokio::test]
    async fn missing_translation_keeps_original() {
        let generator = MockGenerator::new();
        generator
            .push_response(r#"{"entities": [], "relations": []}"#)
            .await;
        let generator: Arc<dyn GeneratorAdapter> = Arc::new(generator);

        let (entities, _) =
            translate_graph(&generator, &[entity("a", "김철수")], &[], "en")
                .await
                .unwrap();
        assert_eq!(entities[0].label, "김철수");
    }

    #[tokio::test]
    async fn garbage_response_is_an_error() {
        let generator = MockGenerator::new();
        generator.push_response("sorry, I cannot do that").await;
        let generator: Arc<dyn GeneratorAdapter> = Arc::new(generator);

        let err = translate_graph(&generator, &[entity("a", "x")], &[], "en")
            .await
            .expect_err("non-JSON response must error");
        assert!(matches!(err, VoxgraphError::Generator { .. }));
    }
}
