//! Field-wise last-writer-wins merge of two versions of the same entity.

use crate::json::Json;
use crate::json::JsonMap;
use crate::normalize::EntityTable;

/// Combines `existing` and `new`, which must both be object-typed entities:
/// the union of field names is taken, and for each field the value from
/// `new` wins if present, otherwise the value from `existing` is kept.
///
/// Fields are not deep-merged: a field's value in `new` replaces the entire
/// value in `existing`. Mutations return complete sub-objects, and the
/// normalizer has already pulled any nested entity out by reference before
/// the merge ever sees it, so there is nothing to merge *inside* a field.
pub fn merge_entities(existing: &Json, new: &Json) -> Json {
    let (Some(existing), Some(new)) = (existing.as_object(), new.as_object()) else {
        // Not both objects: one side isn't a valid entity shape, so the
        // incoming value replaces the old one wholesale.
        return new.clone();
    };

    let mut merged = JsonMap::new();
    for (field, value) in existing.iter() {
        merged.insert(field.clone(), value.clone());
    }
    for (field, value) in new.iter() {
        merged.insert(field.clone(), value.clone());
    }
    Json::Object(merged)
}

/// For each key in `incoming`: insert it into `base` if absent, otherwise
/// replace it with `merge_entities(base[key], incoming[key])`.
pub fn merge_tables(base: &mut EntityTable, incoming: EntityTable) {
    for (key, value) in incoming {
        match base.get(&key) {
            Some(existing) => {
                let merged = merge_entities(existing, &value);
                base.insert(key, merged);
            }
            None => {
                base.insert(key, value);
            }
        }
    }
}
