// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-authoritative graph state manager.
//!
//! One [`GraphManager`] per process owns every in-memory [`SessionGraph`] and
//! is the sole writer to the durable cache copy. Each session has its own
//! async mutex; the critical section covers in-memory reconciliation plus the
//! commit write, never another session's state.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voxgraph_core::types::{
    ExtractionResult, GraphDelta, GraphEntity, GraphRelation, SessionGraph,
};
use voxgraph_core::{GraphStore, VoxgraphError};

use crate::similarity::{
    find_similar_entity, normalize_label, normalize_relation, similarity,
    SIMILARITY_THRESHOLD,
};

/// A snapshot is written every this many versions.
const SNAPSHOT_INTERVAL: u64 = 10;

/// Mapping from LLM-local temporary entity ids to persistent graph ids.
pub type IdMap = HashMap<String, String>;

/// Owns per-session graphs and applies extractions under dedup,
/// identity-reconciliation, and monotonic-version invariants.
pub struct GraphManager {
    store: Arc<dyn GraphStore>,
    sessions: DashMap<String, Arc<Mutex<Option<SessionGraph>>>>,
}

impl GraphManager {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
        }
    }

    /// The per-session slot; the inner `None` means not yet loaded.
    fn slot(&self, session_id: &str) -> Arc<Mutex<Option<SessionGraph>>> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Loads the graph from the cache (or creates an empty one) into the
    /// locked slot. Cache failures degrade to an empty in-memory graph.
    async fn ensure_loaded(&self, session_id: &str, guard: &mut Option<SessionGraph>) {
        if guard.is_some() {
            return;
        }
        let graph = match self.store.load_graph(session_id).await {
            Ok(Some(graph)) => {
                debug!(session_id, version = graph.version, "graph loaded from cache");
                graph
            }
            Ok(None) => {
                let graph = SessionGraph::empty(now_ms());
                if let Err(e) = self.store.save_graph(session_id, &graph).await {
                    warn!(session_id, error = %e, "initial graph persist failed");
                }
                graph
            }
            Err(e) => {
                warn!(session_id, error = %e, "graph load failed, starting empty");
                SessionGraph::empty(now_ms())
            }
        };
        *guard = Some(graph);
    }

    /// Returns a defensive snapshot of the session's current graph.
    pub async fn get_state(&self, session_id: &str) -> SessionGraph {
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;
        self.ensure_loaded(session_id, &mut guard).await;
        guard.get_or_insert_with(|| SessionGraph::empty(now_ms())).clone()
    }

    /// Applies an extraction, discarding the id map.
    pub async fn apply_extraction(
        &self,
        session_id: &str,
        extraction: &ExtractionResult,
    ) -> Result<GraphDelta, VoxgraphError> {
        self.apply_extraction_with_id_map(session_id, extraction, IdMap::new())
            .await
            .map(|(delta, _)| delta)
    }

    /// Applies an extraction under the session lock and returns the delta
    /// plus the temporary-id map.
    ///
    /// `id_map` seeds the resolution table with mappings from earlier partial
    /// applications of the same LLM stream, so relations emitted at the end
    /// of the stream can reference entities created mid-stream.
    pub async fn apply_extraction_with_id_map(
        &self,
        session_id: &str,
        extraction: &ExtractionResult,
        mut id_map: IdMap,
    ) -> Result<(GraphDelta, IdMap), VoxgraphError> {
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;
        self.ensure_loaded(session_id, &mut guard).await;
        let graph = guard.get_or_insert_with(|| SessionGraph::empty(now_ms()));

        let now = now_ms();
        let mut added_entities: Vec<GraphEntity> = Vec::new();
        let mut updated_entities: Vec<GraphEntity> = Vec::new();
        let mut added_relations: Vec<GraphRelation> = Vec::new();

        for extracted in &extraction.entities {
            if let Some(existing) = find_similar_entity(extracted, &graph.entities) {
                let existing_id = existing.id.clone();
                let existing_label_len = existing.label.chars().count();
                id_map.insert(extracted.id.clone(), existing_id.clone());

                // A longer label is treated as more specific and replaces the
                // stored one; type and id are immutable.
                if extracted.label.chars().count() > existing_label_len {
                    if let Some(entry) =
                        graph.entities.iter_mut().find(|e| e.id == existing_id)
                    {
                        entry.label = extracted.label.clone();
                        entry.updated_at = now;
                        updated_entities.push(entry.clone());
                    }
                }
            } else {
                let entity = GraphEntity {
                    id: uuid::Uuid::new_v4().to_string(),
                    label: extracted.label.clone(),
                    entity_type: extracted.entity_type,
                    created_at: now,
                    updated_at: now,
                    metadata: None,
                };
                id_map.insert(extracted.id.clone(), entity.id.clone());
                added_entities.push(entity.clone());
                graph.entities.push(entity);
            }
        }

        for extracted in &extraction.relations {
            let source_id = resolve_endpoint(&id_map, graph, &extracted.source);
            let target_id = resolve_endpoint(&id_map, graph, &extracted.target);

            let (Some(source_id), Some(target_id)) = (source_id, target_id) else {
                warn!(
                    session_id,
                    source = extracted.source.as_str(),
                    target = extracted.target.as_str(),
                    "relation skipped, endpoint not resolvable"
                );
                continue;
            };

            if is_duplicate_relation(graph, &source_id, &target_id, &extracted.relation) {
                continue;
            }

            let relation = GraphRelation {
                id: uuid::Uuid::new_v4().to_string(),
                source: source_id,
                target: target_id,
                relation: extracted.relation.clone(),
                created_at: now,
            };
            added_relations.push(relation.clone());
            graph.relations.push(relation);
        }

        let from_version = graph.version;
        let changed = !added_entities.is_empty()
            || !updated_entities.is_empty()
            || !added_relations.is_empty();

        if changed {
            graph.version += 1;
            graph.last_updated = now;

            // Commit write happens under the session lock; a dead cache only
            // costs durability, not correctness.
            if let Err(e) = self.store.save_graph(session_id, graph).await {
                warn!(session_id, error = %e, "graph persist failed, in-memory only");
            }
            if graph.version % SNAPSHOT_INTERVAL == 0 {
                if let Err(e) = self
                    .store
                    .save_snapshot(session_id, graph.version, graph)
                    .await
                {
                    warn!(session_id, error = %e, "graph snapshot failed");
                }
            }

            info!(
                session_id,
                version = graph.version,
                added_entities = added_entities.len(),
                added_relations = added_relations.len(),
                updated_entities = updated_entities.len(),
                "graph updated"
            );
        }

        let delta = GraphDelta {
            added_entities,
            added_relations,
            updated_entities,
            removed_entity_ids: Vec::new(),
            removed_relation_ids: Vec::new(),
            from_version,
            to_version: graph.version,
        };

        Ok((delta, id_map))
    }

    /// Replaces the session's graph with an empty one at version 0.
    pub async fn reset_state(&self, session_id: &str) {
        let slot = self.slot(session_id);
        let mut guard = slot.lock().await;
        let graph = SessionGraph::empty(now_ms());
        if let Err(e) = self.store.save_graph(session_id, &graph).await {
            warn!(session_id, error = %e, "reset persist failed");
        }
        *guard = Some(graph);
        info!(session_id, "graph state reset");
    }

    /// Drops the in-memory entry for a closed session. The cached copy
    /// remains for resumption unless the store is cleared separately.
    pub fn evict(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

/// Resolve a relation endpoint: temp-id map first, then direct id match,
/// then normalized-label match (the LLM sometimes uses labels as ids).
fn resolve_endpoint(id_map: &IdMap, graph: &SessionGraph, endpoint: &str) -> Option<String> {
    let candidate = id_map
        .get(endpoint)
        .cloned()
        .unwrap_or_else(|| endpoint.to_string());

    if graph.entities.iter().any(|e| e.id == candidate) {
        return Some(candidate);
    }

    let normalized = normalize_label(endpoint);
    graph
        .entities
        .iter()
        .find(|e| normalize_label(&e.label) == normalized)
        .map(|e| e.id.clone())
}

/// Duplicate check against the current graph, in both directions.
fn is_duplicate_relation(
    graph: &SessionGraph,
    source_id: &str,
    target_id: &str,
    relation: &str,
) -> bool {
    let new_rel = normalize_relation(relation);
    for r in &graph.relations {
        if r.source == source_id && r.target == target_id {
            let existing_rel = normalize_relation(&r.relation);
            if existing_rel == new_rel {
                return true;
            }
            if similarity(&existing_rel, &new_rel) > SIMILARITY_THRESHOLD {
                return true;
            }
        }
        if r.source == target_id
            && r.target == source_id
            && similarity(&normalize_relation(&r.relation), &new_rel) > SIMILARITY_THRESHOLD
        {
            return true;
        }
    }
    false
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgraph_core::types::{EntityType, ExtractedEntity, ExtractedRelation};
    use voxgraph_test_utils::MemoryGraphStore;

    fn manager() -> (GraphManager, Arc<MemoryGraphStore>) {
        let store = Arc::new(MemoryGraphStore::new());
        (GraphManager::new(store.clone()), store)
    }

    fn ent(id: &str, label: &str, entity_type: EntityType) -> ExtractedEntity {
        ExtractedEntity {
            id: id.to_string(),
            label: label.to_string(),
            entity_type,
        }
    }

    fn rel(source: &str, target: &str, relation: &str) -> ExtractedRelation {
        ExtractedRelation {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        }
    }

    #[tokio::test]
    async fn fresh_session_starts_at_version_zero() {
        let (manager, _) = manager();
        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 0);
        assert!(state.entities.is_empty());
    }

    #[tokio::test]
    async fn extraction_adds_entities_and_relation() {
        let (manager, store) = manager();
        let extraction = ExtractionResult {
            entities: vec![
                ent("e1", "김철수", EntityType::Person),
                ent("e2", "삼성전자", EntityType::Organization),
            ],
            relations: vec![rel("e1", "e2", "직장")],
        };

        let delta = manager.apply_extraction("s-1", &extraction).await.unwrap();
        assert_eq!(delta.added_entities.len(), 2);
        assert_eq!(delta.added_relations.len(), 1);
        assert_eq!(delta.from_version, 0);
        assert_eq!(delta.to_version, 1);

        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 1);
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.relations.len(), 1);
        // Relation endpoints are persistent ids present in the same graph.
        let relation = &state.relations[0];
        assert!(state.entities.iter().any(|e| e.id == relation.source));
        assert!(state.entities.iter().any(|e| e.id == relation.target));
        assert!(store.save_count() >= 1);
    }

    #[tokio::test]
    async fn reapplying_same_extraction_is_idempotent() {
        let (manager, _) = manager();
        let extraction = ExtractionResult {
            entities: vec![
                ent("e1", "Alice", EntityType::Person),
                ent("e2", "Acme Corp", EntityType::Organization),
            ],
            relations: vec![rel("e1", "e2", "works at")],
        };

        let first = manager.apply_extraction("s-1", &extraction).await.unwrap();
        assert!(!first.is_empty());

        let second = manager.apply_extraction("s-1", &extraction).await.unwrap();
        assert!(second.added_entities.is_empty());
        assert!(second.added_relations.is_empty());
        assert!(second.updated_entities.is_empty());
        // Nothing changed, so the version must not move.
        assert_eq!(second.from_version, second.to_version);

        let state = manager.get_state("s-1").await;
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.relations.len(), 1);
        assert_eq!(state.version, 1);
    }

    #[tokio::test]
    async fn synonym_reconciles_without_new_entity() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Samsung Electronics", EntityType::Organization)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();

        // Shorter partial mention maps to the existing entity; the label is
        // not longer, so there is no update either.
        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Samsung", EntityType::Organization)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();
        assert!(delta.added_entities.is_empty());
        assert!(delta.updated_entities.is_empty());
        assert_eq!(delta.from_version, delta.to_version);
    }

    #[tokio::test]
    async fn longer_label_updates_entity_in_place() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Samsung", EntityType::Organization)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();

        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Samsung Electronics", EntityType::Organization)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();
        assert!(delta.added_entities.is_empty());
        assert_eq!(delta.updated_entities.len(), 1);
        assert_eq!(delta.updated_entities[0].label, "Samsung Electronics");

        let state = manager.get_state("s-1").await;
        assert_eq!(state.entities.len(), 1);
        assert_eq!(state.entities[0].label, "Samsung Electronics");
        assert!(state.entities[0].updated_at >= state.entities[0].created_at);
    }

    #[tokio::test]
    async fn entity_type_is_stable_across_updates() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Apple", EntityType::Organization)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();

        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Apple Incorporated", EntityType::Product)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();

        let state = manager.get_state("s-1").await;
        assert_eq!(state.entities.len(), 1);
        assert_eq!(state.entities[0].entity_type, EntityType::Organization);
    }

    #[tokio::test]
    async fn similar_relation_is_suppressed() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Alice", EntityType::Person),
                        ent("e2", "Acme Corp", EntityType::Organization),
                    ],
                    relations: vec![rel("e1", "e2", "works at")],
                },
            )
            .await
            .unwrap();

        // "works in" normalizes within the 0.7 similarity threshold of
        // "works at" for the same pair.
        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Alice", EntityType::Person),
                        ent("e2", "Acme Corp", EntityType::Organization),
                    ],
                    relations: vec![rel("e1", "e2", "works in")],
                },
            )
            .await
            .unwrap();
        assert!(delta.added_relations.is_empty());
    }

    #[tokio::test]
    async fn reverse_relation_is_suppressed() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Alice", EntityType::Person),
                        ent("e2", "Acme Corp", EntityType::Organization),
                    ],
                    relations: vec![rel("e1", "e2", "partners with")],
                },
            )
            .await
            .unwrap();

        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Alice", EntityType::Person),
                        ent("e2", "Acme Corp", EntityType::Organization),
                    ],
                    relations: vec![rel("e2", "e1", "partners with")],
                },
            )
            .await
            .unwrap();
        assert!(delta.added_relations.is_empty());
    }

    #[tokio::test]
    async fn relation_binds_by_label_fallback() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Alice", EntityType::Person),
                        ent("e2", "Acme Corp", EntityType::Organization),
                    ],
                    relations: vec![],
                },
            )
            .await
            .unwrap();

        // The LLM used labels instead of temp ids; resolution falls back to
        // normalized-label matching.
        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![],
                    relations: vec![rel("Alice", "Acme Corp", "founded")],
                },
            )
            .await
            .unwrap();
        assert_eq!(delta.added_relations.len(), 1);
    }

    #[tokio::test]
    async fn relation_with_unresolvable_endpoint_is_skipped() {
        let (manager, _) = manager();
        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Alice", EntityType::Person)],
                    relations: vec![rel("e1", "e9", "knows")],
                },
            )
            .await
            .unwrap();
        assert!(delta.added_relations.is_empty());
        assert_eq!(delta.added_entities.len(), 1);
    }

    #[tokio::test]
    async fn id_map_carries_across_partial_applications() {
        let (manager, _) = manager();

        // First pass: entities only, as during streaming.
        let (delta, id_map) = manager
            .apply_extraction_with_id_map(
                "s-1",
                &ExtractionResult {
                    entities: vec![
                        ent("e1", "Apple", EntityType::Organization),
                        ent("e2", "iPhone 15", EntityType::Product),
                    ],
                    relations: vec![],
                },
                IdMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(delta.added_entities.len(), 2);
        assert_eq!(id_map.len(), 2);

        // Second pass: relations referencing the temp ids from the stream.
        let (delta, _) = manager
            .apply_extraction_with_id_map(
                "s-1",
                &ExtractionResult {
                    entities: vec![],
                    relations: vec![rel("e1", "e2", "released")],
                },
                id_map,
            )
            .await
            .unwrap();
        assert_eq!(delta.added_relations.len(), 1);
        assert_eq!(delta.from_version, 1);
        assert_eq!(delta.to_version, 2);
    }

    #[tokio::test]
    async fn snapshot_written_every_tenth_version() {
        let (manager, store) = manager();
        // Labels distinct enough that no similarity rule reconciles them.
        let labels = [
            "Alpha Centauri",
            "Borealis",
            "Cascadia",
            "Drumlin",
            "Eigenvalue",
            "Fjord Crossing",
            "Gossamer",
            "Hinterland",
            "Isthmus",
            "Juniper Ridge",
        ];
        for label in labels {
            manager
                .apply_extraction(
                    "s-1",
                    &ExtractionResult {
                        entities: vec![ent("e1", label, EntityType::Concept)],
                        relations: vec![],
                    },
                )
                .await
                .unwrap();
        }
        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 10);
        assert!(store.has_snapshot("s-1", 10));
        assert_eq!(store.snapshot_count(), 1);
    }

    #[tokio::test]
    async fn cache_failure_is_soft() {
        let (manager, store) = manager();
        store.set_failing(true);
        let delta = manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Alice", EntityType::Person)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(delta.added_entities.len(), 1);
        // In-memory state advanced even though persistence failed.
        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 1);
    }

    #[tokio::test]
    async fn reset_returns_to_version_zero() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Alice", EntityType::Person)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();
        manager.reset_state("s-1").await;
        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 0);
        assert!(state.entities.is_empty());
    }

    #[tokio::test]
    async fn graph_reloads_from_cache_after_eviction() {
        let (manager, _) = manager();
        manager
            .apply_extraction(
                "s-1",
                &ExtractionResult {
                    entities: vec![ent("e1", "Alice", EntityType::Person)],
                    relations: vec![],
                },
            )
            .await
            .unwrap();
        manager.evict("s-1");

        let state = manager.get_state("s-1").await;
        assert_eq!(state.version, 1);
        assert_eq!(state.entities.len(), 1);
    }
}
