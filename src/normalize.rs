//! Walks a parsed GraphQL response and extracts entities into a flat table,
//! replacing each extracted entity subtree with a `{__ref: entity_key}`
//! placeholder in the remaining "skeleton" tree.

use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;
use tracing::trace;

use crate::json::make_reference;
use crate::json::Json;
use crate::json::JsonMap;
use crate::key::entity_key;
use crate::key::infer_typename;

/// `entity_key -> entity object` (itself a skeleton: nested entities are
/// referenced, not inlined).
pub type EntityTable = IndexMap<String, Json>;

/// The result of walking a response tree: the entities pulled out of it, and
/// the tree with those entities replaced by reference placeholders.
pub struct Extracted {
    pub entities: EntityTable,
    pub skeleton: Json,
}

/// `extract(tree) -> (entity_table, skeleton)`, see module docs.
pub fn extract(tree: &Json) -> Extracted {
    let mut entities = EntityTable::new();
    let skeleton = walk(tree, &[], &mut entities);
    debug!(entity_count = entities.len(), "normalized response");
    Extracted { entities, skeleton }
}

fn walk(value: &Json, path: &[String], entities: &mut EntityTable) -> Json {
    match value {
        Json::Object(map) => walk_object(map, path, entities),
        Json::Array(items) => walk_array(items, path, entities),
        scalar => scalar.clone(),
    }
}

fn walk_object(map: &JsonMap, path: &[String], entities: &mut EntityTable) -> Json {
    match entity_id(map) {
        Some(id) => {
            let typename = entity_typename(map, path);
            let key = entity_key(&typename, &id);

            let mut normalized = JsonMap::new();
            for (field, field_value) in map.iter() {
                let mut field_path = path.to_vec();
                field_path.push(field.as_str().to_string());
                normalized.insert(field.clone(), walk(field_value, &field_path, entities));
            }

            merge_into_table(entities, &key, Json::Object(normalized));
            trace!(entity_key = %key, field_count = map.len(), "extracted entity");
            make_reference(&key)
        }
        None => {
            let mut normalized = JsonMap::new();
            for (field, field_value) in map.iter() {
                let mut field_path = path.to_vec();
                field_path.push(field.as_str().to_string());
                normalized.insert(field.clone(), walk(field_value, &field_path, entities));
            }
            Json::Object(normalized)
        }
    }
}

fn walk_array(items: &[Json], path: &[String], entities: &mut EntityTable) -> Json {
    if is_connection_edges_array(items) {
        return walk_edges(items, path, entities);
    }

    Json::Array(items.iter().map(|item| walk(item, path, entities)).collect())
}

fn is_connection_edges_array(items: &[Json]) -> bool {
    matches!(
        items.first(),
        Some(Json::Object(first)) if first.contains_key("node")
    )
}

/// §4.1.1 connection-edge deduplication: drop every edge after the first one
/// whose `node` resolves to an already-seen entity key.
fn walk_edges(items: &[Json], path: &[String], entities: &mut EntityTable) -> Json {
    let mut seen = IndexSet::new();
    let mut out = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for item in items {
        if let Json::Object(edge) = item
            && let Some(Json::Object(node)) = edge.get("node")
            && let Some(id) = entity_id(node)
        {
            let mut node_path = path.to_vec();
            node_path.push("node".to_string());
            let typename = entity_typename(node, &node_path);
            let node_key = entity_key(&typename, &id);

            if !seen.insert(node_key) {
                dropped += 1;
                continue;
            }
        }

        out.push(walk(item, path, entities));
    }

    if dropped > 0 {
        debug!(dropped, "dropped duplicate connection edges");
    }

    Json::Array(out)
}

/// An object is an entity iff it carries a string `id` field.
fn entity_id(map: &JsonMap) -> Option<String> {
    match map.get("id") {
        Some(Json::String(id)) => Some(id.as_str().to_string()),
        _ => None,
    }
}

fn entity_typename(map: &JsonMap, path: &[String]) -> String {
    match map.get("__typename") {
        Some(Json::String(typename)) => typename.as_str().to_string(),
        _ => infer_typename(path),
    }
}

/// Emits `value` under `key`, merging with any entity already emitted under
/// that key earlier in the same traversal (see the merge function, §4.3 /
/// [`crate::merge`]).
fn merge_into_table(entities: &mut EntityTable, key: &str, value: Json) {
    match entities.get(key) {
        Some(existing) => {
            let merged = crate::merge::merge_entities(existing, &value);
            entities.insert(key.to_string(), merged);
        }
        None => {
            entities.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::as_reference;
    use crate::json::parse;

    fn ref_key(value: &Json) -> &str {
        as_reference(value).expect("expected a reference placeholder")
    }

    #[test]
    fn s1_entity_extraction() {
        let tree = parse(
            r#"{"data":{"settings":{"__typename":"Settings","id":"singleton","domainAuthority":"fm.teal"}}}"#,
        )
        .unwrap();
        let Extracted { entities, skeleton } = extract(&tree);

        let entity = entities.get("Settings:singleton").unwrap();
        assert_eq!(
            entity.get("domainAuthority").and_then(Json::as_str),
            Some("fm.teal")
        );

        let settings_ref = skeleton
            .get("data")
            .and_then(|d| d.get("settings"))
            .unwrap();
        assert_eq!(ref_key(settings_ref), "Settings:singleton");
    }

    #[test]
    fn s3_array_extraction() {
        let tree = parse(
            r#"{"data":{"users":[{"__typename":"User","id":"1","name":"Alice"},{"__typename":"User","id":"2","name":"Bob"}]}}"#,
        )
        .unwrap();
        let Extracted { entities, skeleton } = extract(&tree);

        assert!(entities.contains_key("User:1"));
        assert!(entities.contains_key("User:2"));

        let users = skeleton.get("data").and_then(|d| d.get("users")).unwrap();
        let users = users.as_array().unwrap();
        assert_eq!(ref_key(&users[0]), "User:1");
        assert_eq!(ref_key(&users[1]), "User:2");
    }

    #[test]
    fn s4_no_entities() {
        let tree = parse(r#"{"data":{"count":42,"message":"success"}}"#).unwrap();
        let Extracted { entities, skeleton } = extract(&tree);
        assert!(entities.is_empty());
        assert_eq!(skeleton, tree);
    }

    #[test]
    fn s5_nested_entity() {
        let tree = parse(
            r#"{"data":{"post":{"__typename":"Post","id":"1","title":"Hi","author":{"__typename":"User","id":"1","name":"Alice"}}}}"#,
        )
        .unwrap();
        let Extracted { entities, .. } = extract(&tree);

        assert!(entities.contains_key("User:1"));
        let post = entities.get("Post:1").unwrap();
        assert_eq!(ref_key(post.get("author").unwrap()), "User:1");
    }

    #[test]
    fn infers_typename_when_missing() {
        let tree = parse(r#"{"data":{"users":[{"id":"1","name":"Alice"}]}}"#).unwrap();
        let Extracted { entities, .. } = extract(&tree);
        assert!(entities.contains_key("User:1"));
    }

    #[test]
    fn dedups_connection_edges_keeping_the_first() {
        let tree = parse(
            r#"{"data":{"posts":{"edges":[
                {"cursor":"a","node":{"__typename":"Post","id":"1","title":"First"}},
                {"cursor":"b","node":{"__typename":"Post","id":"1","title":"Stale duplicate"}},
                {"cursor":"c","node":{"__typename":"Post","id":"2","title":"Second"}}
            ]}}}"#,
        )
        .unwrap();
        let Extracted { entities, skeleton } = extract(&tree);

        assert_eq!(entities.len(), 2);
        let edges = skeleton
            .get("data")
            .and_then(|d| d.get("posts"))
            .and_then(|p| p.get("edges"))
            .and_then(Json::as_array)
            .unwrap();
        assert_eq!(edges.len(), 2);

        let first_node = edges[0].get("node").unwrap();
        assert_eq!(ref_key(first_node), "Post:1");
        // The surviving edge keeps its first cursor, not the duplicate's.
        assert_eq!(edges[0].get("cursor").and_then(Json::as_str), Some("a"));
    }

    #[test]
    fn edges_without_ids_pass_through_undeduped() {
        let tree = parse(
            r#"{"data":{"items":{"edges":[
                {"cursor":"a","node":{"value":1}},
                {"cursor":"b","node":{"value":1}}
            ]}}}"#,
        )
        .unwrap();
        let Extracted { skeleton, .. } = extract(&tree);
        let edges = skeleton
            .get("data")
            .and_then(|d| d.get("items"))
            .and_then(|p| p.get("edges"))
            .and_then(Json::as_array)
            .unwrap();
        assert_eq!(edges.len(), 2);
    }
}
