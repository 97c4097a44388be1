// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session graph model: entities, relations, versioned state, and deltas.
//!
//! The server is authoritative for graph state. Clients receive a
//! [`SessionGraph`] once on session start and apply [`GraphDelta`]s in
//! `(from_version, to_version)` order afterwards.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Closed set of entity types the extractor may assign.
///
/// Anything the LLM invents outside this set collapses to [`EntityType::Unknown`]
/// at the deserialization boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Concept,
    Event,
    Product,
    Technology,
    Date,
    Metric,
    Action,
    #[serde(other)]
    Unknown,
}

impl EntityType {
    /// Parse an entity type string, collapsing unrecognized values to `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(EntityType::Unknown)
    }
}

/// An entity in the session graph.
///
/// `id` is server-assigned and never changes; `entity_type` is fixed at
/// creation. The label may only be replaced by a strictly longer one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEntity {
    /// Opaque server-assigned identifier.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Entity classification, stable across the entity's lifetime.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Creation time in milliseconds since the epoch.
    pub created_at: i64,
    /// Last update time in milliseconds since the epoch.
    pub updated_at: i64,
    /// Optional free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A directed relation between two entities in the same session graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRelation {
    /// Opaque server-assigned identifier.
    pub id: String,
    /// Source entity id.
    pub source: String,
    /// Target entity id.
    pub target: String,
    /// Free-text relation phrase.
    pub relation: String,
    /// Creation time in milliseconds since the epoch.
    pub created_at: i64,
}

/// The versioned entity/relation set scoped to one client session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGraph {
    /// Monotonically increasing version, starting at 0 for an empty graph.
    pub version: u64,
    pub entities: Vec<GraphEntity>,
    pub relations: Vec<GraphRelation>,
    /// Last update time in milliseconds since the epoch.
    pub last_updated: i64,
}

impl SessionGraph {
    /// Create an empty graph at version 0.
    pub fn empty(now_ms: i64) -> Self {
        Self {
            version: 0,
            entities: Vec::new(),
            relations: Vec::new(),
            last_updated: now_ms,
        }
    }
}

/// The transition between two adjacent graph versions.
///
/// The current design only produces additions and updates; the removed-id
/// lists exist for wire compatibility and are always empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDelta {
    pub added_entities: Vec<GraphEntity>,
    pub added_relations: Vec<GraphRelation>,
    pub updated_entities: Vec<GraphEntity>,
    pub removed_entity_ids: Vec<String>,
    pub removed_relation_ids: Vec<String>,
    pub from_version: u64,
    pub to_version: u64,
}

impl GraphDelta {
    /// True when the delta carries no additions or updates.
    pub fn is_empty(&self) -> bool {
        self.added_entities.is_empty()
            && self.added_relations.is_empty()
            && self.updated_entities.is_empty()
    }
}

/// An entity as emitted by the LLM, carrying a model-local temporary id.
///
/// Lives only between extraction and reconciliation; the graph manager maps
/// the temporary id to a persistent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// LLM-local temporary id (e.g. "e1").
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

/// A relation as emitted by the LLM.
///
/// `source` and `target` may be temporary ids or entity labels; the graph
/// manager resolves either form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// One extraction's worth of pre-reconciliation entities and relations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<ExtractedEntity>,
    pub relations: Vec<ExtractedRelation>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}
