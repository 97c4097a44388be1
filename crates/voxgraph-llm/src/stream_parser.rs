// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental parser for the extractor's JSON output.
//!
//! The generator produces one JSON document, possibly wrapped in a fenced
//! code block, arriving in arbitrary chunk boundaries. This is not a general
//! JSON parser: it pattern-matches complete object literals inside the
//! "entities" and "relations" arrays and emits each exactly once, as soon as
//! it is fully present in the buffer. Truncated tails and a missing closing
//! bracket are tolerated.

use std::collections::HashSet;

use voxgraph_core::types::{
    EntityType, ExtractedEntity, ExtractedRelation, ExtractionResult,
};

/// Append-only streaming parser; one instance per extraction call.
#[derive(Debug, Default)]
pub struct StreamingParser {
    buffer: String,
    seen_entity_ids: HashSet<String>,
    seen_relations: HashSet<(String, String, String)>,
    entities: Vec<ExtractedEntity>,
    relations: Vec<ExtractedRelation>,
}

impl StreamingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the entities and relations that became
    /// fully parseable since the last call.
    ///
    /// Idempotent under duplicate content: an object is emitted at most once
    /// per entity id / relation triple.
    pub fn feed(&mut self, chunk: &str) -> (Vec<ExtractedEntity>, Vec<ExtractedRelation>) {
        self.buffer.push_str(chunk);

        let region = json_region(&self.buffer);
        let mut new_entities = Vec::new();
        let mut new_relations = Vec::new();

        for object in objects_in_array(region, "\"entities\"") {
            let Some(entity) = parse_entity(object) else {
                continue;
            };
            if self.seen_entity_ids.insert(entity.id.clone()) {
                self.entities.push(entity.clone());
                new_entities.push(entity);
            }
        }

        for object in objects_in_array(region, "\"relations\"") {
            let Some(relation) = parse_relation(object) else {
                continue;
            };
            let key = (
                relation.source.clone(),
                relation.target.clone(),
                relation.relation.clone(),
            );
            if self.seen_relations.insert(key) {
                self.relations.push(relation.clone());
                new_relations.push(relation);
            }
        }

        (new_entities, new_relations)
    }

    /// Everything parsed so far, in emission order.
    pub fn result(&self) -> ExtractionResult {
        ExtractionResult {
            entities: self.entities.clone(),
            relations: self.relations.clone(),
        }
    }

    /// True when no objects have been parsed yet.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

/// Parse a complete document in one pass (the single-shot path).
pub fn parse_document(text: &str) -> ExtractionResult {
    let mut parser = StreamingParser::new();
    parser.feed(text);
    parser.result()
}

/// Narrows the buffer to the JSON region, skipping an optional code fence.
fn json_region(buffer: &str) -> &str {
    let Some(fence) = buffer.find("```") else {
        return buffer;
    };
    let mut start = fence + 3;
    if buffer[start..].starts_with("json") {
        start += 4;
    }
    let rest = &buffer[start..];
    match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Complete top-level object literals inside the array following `key`.
///
/// Scans from the first `[` after the key, respecting string literals, and
/// stops at the array's closing bracket or the end of the buffer (an
/// unterminated array yields whatever objects are complete so far).
fn objects_in_array<'a>(region: &'a str, key: &str) -> Vec<&'a str> {
    let Some(key_idx) = region.find(key) else {
        return Vec::new();
    };
    let after_key = &region[key_idx + key.len()..];
    let Some(bracket) = after_key.find('[') else {
        return Vec::new();
    };
    let array = &after_key[bracket + 1..];

    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in array.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(st) = start.take() {
                            objects.push(&array[st..=i]);
                        }
                    }
                }
            }
            ']' => {
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }

    objects
}

/// Parses one entity object; requires id, label, and type fields in any order.
fn parse_entity(object: &str) -> Option<ExtractedEntity> {
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    let id = value.get("id")?.as_str()?;
    let label = value.get("label")?.as_str()?;
    let type_str = value.get("type")?.as_str()?;
    Some(ExtractedEntity {
        id: id.to_string(),
        label: label.to_string(),
        entity_type: EntityType::parse_lenient(type_str),
    })
}

/// Parses one relation object; requires source, target, and relation fields.
fn parse_relation(object: &str) -> Option<ExtractedRelation> {
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    let source = value.get("source")?.as_str()?;
    let target = value.get("target")?.as_str()?;
    let relation = value.get("relation")?.as_str()?;
    Some(ExtractedRelation {
        source: source.to_string(),
        target: target.to_string(),
        relation: relation.to_string(),
    })
}
