//! Reconstitutes a query response by resolving `{__ref: entity_key}`
//! placeholders against the overlay-then-base entity store.

use indexmap::IndexSet;

use crate::json::as_reference;
use crate::json::Json;
use crate::json::JsonMap;
use crate::normalize::EntityTable;

/// Walks `skeleton`, replacing every reference placeholder it finds by the
/// entity currently visible for that key (overlay first, then base). An
/// unresolved reference — key absent from both stores — passes through
/// unchanged. Cyclic entity graphs are handled by tracking the entity keys
/// already being resolved on the current path: a key revisited on its own
/// path is left as a reference rather than recursed into again.
pub fn denormalize(skeleton: &Json, overlay: &EntityTable, base: &EntityTable) -> Json {
    let mut in_progress = IndexSet::new();
    resolve(skeleton, overlay, base, &mut in_progress)
}

fn resolve(
    value: &Json,
    overlay: &EntityTable,
    base: &EntityTable,
    in_progress: &mut IndexSet<String>,
) -> Json {
    if let Some(key) = as_reference(value) {
        return resolve_reference(key, overlay, base, in_progress);
    }

    match value {
        Json::Object(map) => {
            let mut out = JsonMap::new();
            for (field, field_value) in map.iter() {
                out.insert(field.clone(), resolve(field_value, overlay, base, in_progress));
            }
            Json::Object(out)
        }
        Json::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| resolve(item, overlay, base, in_progress))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn resolve_reference(
    key: &str,
    overlay: &EntityTable,
    base: &EntityTable,
    in_progress: &mut IndexSet<String>,
) -> Json {
    let Some(entity) = overlay.get(key).or_else(|| base.get(key)) else {
        // Unresolved: leave the placeholder intact.
        return crate::json::make_reference(key);
    };

    if !in_progress.insert(key.to_string()) {
        // Already resolving this key somewhere up the call stack: break the
        // cycle by leaving a reference rather than recursing forever.
        return crate::json::make_reference(key);
    }

    let resolved = resolve(entity, overlay, base, in_progress);
    in_progress.shift_remove(key);
    resolved
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::json::parse;
    use crate::normalize::extract;
    use crate::normalize::Extracted;

    #[test]
    fn roundtrips_a_response_with_empty_overlay() {
        let tree = parse(
            r#"{"data":{"post":{"__typename":"Post","id":"1","title":"Hi","author":{"__typename":"User","id":"1","name":"Alice"}}}}"#,
        )
        .unwrap();
        let Extracted { entities, skeleton } = extract(&tree);

        let overlay = EntityTable::new();
        let result = denormalize(&skeleton, &overlay, &entities);
        assert_eq!(result, tree);
    }

    #[test]
    fn overlay_shadows_base() {
        let tree = parse(r#"{"data":{"settings":{"__typename":"Settings","id":"singleton","domainAuthority":"fm.teal"}}}"#).unwrap();
        let Extracted { entities, skeleton } = extract(&tree);

        let mut overlay = EntityTable::new();
        overlay.insert(
            "Settings:singleton".to_string(),
            parse(r#"{"__typename":"Settings","id":"singleton","domainAuthority":"xyz.statusphere"}"#).unwrap(),
        );

        let result = denormalize(&skeleton, &overlay, &entities);
        let domain_authority = result
            .get("data")
            .and_then(|d| d.get("settings"))
            .and_then(|s| s.get("domainAuthority"))
            .and_then(Json::as_str);
        assert_eq!(domain_authority, Some("xyz.statusphere"));
    }

    #[test]
    fn unresolved_reference_passes_through() {
        let skeleton = crate::json::make_reference("Missing:1");
        let overlay = EntityTable::new();
        let base = EntityTable::new();
        let result = denormalize(&skeleton, &overlay, &base);
        assert_eq!(result, skeleton);
    }

    #[test]
    fn cyclic_entities_terminate() {
        let mut base = EntityTable::new();
        base.insert(
            "User:1".to_string(),
            parse(r#"{"id":"1","name":"Alice","bestFriend":{"__ref":"User:2"}}"#).unwrap(),
        );
        base.insert(
            "User:2".to_string(),
            parse(r#"{"id":"2","name":"Bob","bestFriend":{"__ref":"User:1"}}"#).unwrap(),
        );

        let overlay = EntityTable::new();
        let skeleton = crate::json::make_reference("User:1");
        // Must terminate rather than recurse forever.
        let result = denormalize(&skeleton, &overlay, &base);
        assert_eq!(result.get("name").and_then(Json::as_str), Some("Alice"));
        let friend = result.get("bestFriend").unwrap();
        assert_eq!(friend.get("name").and_then(Json::as_str), Some("Bob"));
        // The cycle back to User:1 is left as a reference.
        assert_eq!(
            crate::json::as_reference(friend.get("bestFriend").unwrap()),
            Some("User:1")
        );
    }
}
