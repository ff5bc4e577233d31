//! The optimistic overlay: provisional entity values applied ahead of a
//! mutation's real response, and their commit/rollback lifecycle.

use indexmap::IndexMap;
use tracing::debug;
use tracing::warn;

use crate::json::parse;
use crate::json::Json;
use crate::normalize::extract;
use crate::normalize::EntityTable;
use crate::normalize::Extracted;

/// `mutation_id -> entity_key`.
pub type MutationTable = IndexMap<String, String>;

/// Writes `updater`'s result into `overlay[entity_key]` and records
/// `mutation_id -> entity_key`. `updater` is handed whatever is currently
/// visible at `entity_key` (overlay first, then base, then `None`).
///
/// If a second mutation targets the same entity, its write simply overwrites
/// the first in the overlay; both ids remain recorded in `mutations`, and
/// rolling back the second does not resurrect the first — conflicting
/// mutations on the same entity are the caller's responsibility to serialize.
pub fn apply_optimistic_update(
    overlay: &mut EntityTable,
    mutations: &mut MutationTable,
    base: &EntityTable,
    mutation_id: &str,
    entity_key: &str,
    updater: impl FnOnce(Option<&Json>) -> Json,
) {
    let current = overlay.get(entity_key).or_else(|| base.get(entity_key));
    let updated = updater(current);
    overlay.insert(entity_key.to_string(), updated);
    mutations.insert(mutation_id.to_string(), entity_key.to_string());
}

/// Removes the overlay entry and mutation record for `mutation_id`. A no-op,
/// returning the tables unchanged, if `mutation_id` is unknown.
pub fn rollback_optimistic(
    overlay: &mut EntityTable,
    mutations: &mut MutationTable,
    mutation_id: &str,
) {
    match mutations.shift_remove(mutation_id) {
        Some(entity_key) => {
            overlay.shift_remove(&entity_key);
            debug!(mutation_id, "rolled back optimistic mutation");
        }
        None => warn!(mutation_id, "rollback of unknown mutation id, ignoring"),
    }
}

/// Parses `response_body`, merges its entities into `base`, then removes the
/// overlay entry and mutation record for `mutation_id`. The overlay/mutation
/// entries are removed even if `response_body` fails to parse — the
/// authoritative response is expected to have already flowed through
/// `store_query` earlier in the same update cycle, so the overlay's job is
/// done either way.
pub fn commit_optimistic(
    overlay: &mut EntityTable,
    mutations: &mut MutationTable,
    base: &mut EntityTable,
    mutation_id: &str,
    response_body: &str,
) {
    if let Ok(tree) = parse(response_body) {
        let Extracted {
            entities: extracted,
            ..
        } = extract(&tree);
        crate::merge::merge_tables(base, extracted);
    }

    match mutations.shift_remove(mutation_id) {
        Some(entity_key) => {
            overlay.shift_remove(&entity_key);
            debug!(mutation_id, "committed optimistic mutation");
        }
        None => warn!(mutation_id, "commit of unknown mutation id, ignoring"),
    }
}

/// `true` iff at least one optimistic mutation is outstanding.
pub fn has_pending_mutations(mutations: &MutationTable) -> bool {
    !mutations.is_empty()
}
