// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Label and relation normalization plus the entity similarity cascade.
//!
//! Reconciliation is deliberately forgiving: transcribed speech produces the
//! same entity under many surface forms (punctuation, casing, partial
//! mentions), and the extractor adds its own variation on top.

use voxgraph_core::types::{ExtractedEntity, GraphEntity};

/// Threshold for same-type fuzzy matches and relation dedup.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Threshold for type-free fuzzy matches.
pub const HIGH_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Normalize a label: lowercase, keep only word characters (covers Korean
/// syllables and other alphabetic scripts).
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Normalize a relation phrase: lowercase, non-word characters become `_`.
pub fn normalize_relation(relation: &str) -> String {
    relation
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Levenshtein-derived similarity: `(max_len - distance) / max_len`.
///
/// Empty input on either side scores 0.0.
pub fn similarity(s1: &str, s2: &str) -> f64 {
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(s1, s2)
}

/// Find an existing entity the extracted one should reconcile to.
///
/// Rules are tried in order; the first match wins:
/// 1. Exact match on normalized label (any type).
/// 2. Exact match on case-insensitive trimmed label.
/// 3. One normalized label contains the other, both >= 3 chars.
/// 4. Same type and similarity > 0.7.
/// 5. Any type and similarity > 0.9 (unifies near-identical labels across
///    types, e.g. a product and the company sharing a name).
pub fn find_similar_entity<'a>(
    extracted: &ExtractedEntity,
    existing: &'a [GraphEntity],
) -> Option<&'a GraphEntity> {
    let normalized = normalize_label(&extracted.label);
    if normalized.is_empty() {
        return None;
    }

    for entity in existing {
        if normalize_label(&entity.label) == normalized {
            return Some(entity);
        }
    }

    let trimmed = extracted.label.trim().to_lowercase();
    for entity in existing {
        if entity.label.trim().to_lowercase() == trimmed {
            return Some(entity);
        }
    }

    if normalized.chars().count() >= 3 {
        for entity in existing {
            let entity_normalized = normalize_label(&entity.label);
            if entity_normalized.chars().count() >= 3
                && (entity_normalized.contains(&normalized)
                    || normalized.contains(&entity_normalized))
            {
                return Some(entity);
            }
        }
    }

    for entity in existing {
        if entity.entity_type != extracted.entity_type {
            continue;
        }
        if similarity(&normalized, &normalize_label(&entity.label)) > SIMILARITY_THRESHOLD {
            return Some(entity);
        }
    }

    for entity in existing {
        if similarity(&normalized, &normalize_label(&entity.label))
            > HIGH_SIMILARITY_THRESHOLD
        {
            return Some(entity);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgraph_core::types::EntityType;

    fn entity(id: &str, label: &str, entity_type: EntityType) -> GraphEntity {
        GraphEntity {
            id: id.to_string(),
            label: label.to_string(),
            entity_type,
            created_at: 0,
            updated_at: 0,
            metadata: None,
        }
    }

    fn extracted(label: &str, entity_type: EntityType) -> ExtractedEntity {
        ExtractedEntity {
            id: "e1".to_string(),
            label: label.to_string(),
            entity_type,
        }
    }

    #[test]
    fn normalize_label_is_idempotent() {
        let once = normalize_label("  Samsung Electronics! ");
        let twice = normalize_label(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "samsungelectronics");
    }

    #[test]
    fn normalize_label_keeps_korean_syllables() {
        assert_eq!(normalize_label("삼성전자(주)"), "삼성전자주");
    }

    #[test]
    fn normalize_relation_replaces_punctuation() {
        assert_eq!(normalize_relation("works at"), "works_at");
        assert_eq!(normalize_relation("Works-At!"), "works_at_");
    }

    #[test]
    fn similarity_of_empty_is_zero() {
        assert_eq!(similarity("", "abc"), 0.0);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn exact_normalized_match_wins_across_types() {
        let existing = vec![entity("x", "Apple Inc.", EntityType::Organization)];
        let found = find_similar_entity(
            &extracted("apple inc", EntityType::Product),
            &existing,
        );
        assert_eq!(found.map(|e| e.id.as_str()), Some("x"));
    }

    #[test]
    fn containment_matches_partial_mention() {
        let existing = vec![entity("x", "Samsung Electronics", EntityType::Organization)];
        let found = find_similar_entity(
            &extracted("Samsung", EntityType::Organization),
            &existing,
        );
        assert_eq!(found.map(|e| e.id.as_str()), Some("x"));
    }

    #[test]
    fn containment_requires_three_normalized_chars() {
        let existing = vec![entity("x", "AI Research Lab", EntityType::Organization)];
        let found =
            find_similar_entity(&extracted("AI", EntityType::Organization), &existing);
        assert!(found.is_none(), "two-char label must not containment-match");
    }

    #[test]
    fn typed_fuzzy_match_above_threshold() {
        let existing = vec![entity("x", "Kubernetes", EntityType::Technology)];
        let found = find_similar_entity(
            &extracted("Kuberneti", EntityType::Technology),
            &existing,
        );
        assert_eq!(found.map(|e| e.id.as_str()), Some("x"));
    }

    #[test]
    fn typed_fuzzy_match_respects_type() {
        // Similar labels, different types, similarity between 0.7 and 0.9:
        // neither the typed rule nor the high-similarity rule fires.
        let existing = vec![entity("x", "transformer", EntityType::Technology)];
        let found = find_similar_entity(
            &extracted("transforms", EntityType::Concept),
            &existing,
        );
        assert!(found.is_none());
    }

    #[test]
    fn high_similarity_ignores_type() {
        // One substitution in a 15-char label: above 0.9, not a containment.
        let existing = vec![entity("x", "Anthropic Claude", EntityType::Product)];
        let found = find_similar_entity(
            &extracted("Anthropic Cloude", EntityType::Technology),
            &existing,
        );
        assert_eq!(found.map(|e| e.id.as_str()), Some("x"));
    }

    #[test]
    fn no_match_for_unrelated_labels() {
        let existing = vec![entity("x", "김철수", EntityType::Person)];
        let found = find_similar_entity(
            &extracted("삼성전자", EntityType::Organization),
            &existing,
        );
        assert!(found.is_none());
    }
}
