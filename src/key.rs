//! Key derivation: turning `(query name, variables)` and `(typename, id)`
//! pairs into the colon-delimited strings the rest of the cache indexes by.

use crate::json::canonical_json;
use crate::json::Json;

/// `query_key(name, variables) = name ":" canonical_json(variables)`.
pub fn query_key(name: &str, variables: &Json) -> String {
    debug_assert!(
        !name.contains(':'),
        "query names must not contain ':', got {name:?}"
    );
    format!("{name}:{}", canonical_json(variables))
}

/// Splits a query key back into `(name, canonical_variables_json)` by
/// splitting on the *first* `:`, as required so that `process_pending` can
/// reverse-decode keys drawn from `pending_fetches`.
pub fn split_query_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(':')
}

/// `entity_key(typename, id) = typename ":" id`.
pub fn entity_key(typename: &str, id: &str) -> String {
    debug_assert!(
        !typename.contains(':'),
        "typenames must not contain ':', got {typename:?}"
    );
    format!("{typename}:{id}")
}

/// Path segments that never contribute to typename inference: list/edge
/// wrapper names conventional in GraphQL responses.
const RESERVED_PATH_SEGMENTS: &[&str] = &["data", "results", "edges", "node"];

/// Infers a typename from the field-name path leading to an entity that
/// omitted `__typename`. Scans from deepest to shallowest, skipping reserved
/// wrapper segments, singularizes the first remaining segment by stripping a
/// single trailing `s`, and upper-cases its first character. Falls back to
/// `"Entity"` if no segment qualifies.
pub fn infer_typename(path: &[String]) -> String {
    for segment in path.iter().rev() {
        if RESERVED_PATH_SEGMENTS.contains(&segment.as_str()) {
            continue;
        }
        return singularize_and_capitalize(segment);
    }
    "Entity".to_string()
}

fn singularize_and_capitalize(segment: &str) -> String {
    let singular = segment.strip_suffix('s').unwrap_or(segment);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Entity".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse;

    #[test]
    fn query_key_sorts_variable_keys() {
        let vars_a = parse(r#"{"id":"1","limit":10}"#).unwrap();
        let vars_b = parse(r#"{"limit":10,"id":"1"}"#).unwrap();
        assert_eq!(query_key("GetUser", &vars_a), query_key("GetUser", &vars_b));
    }

    #[test]
    fn split_query_key_uses_first_colon_only() {
        let key = query_key("GetUser", &parse(r#"{"a":"x:y"}"#).unwrap());
        let (name, vars) = split_query_key(&key).unwrap();
        assert_eq!(name, "GetUser");
        assert_eq!(vars, r#"{"a":"x:y"}"#);
    }

    #[test]
    fn entity_key_format() {
        assert_eq!(entity_key("User", "1"), "User:1");
    }

    #[test]
    fn infer_typename_skips_reserved_segments_and_singularizes() {
        let path = vec!["data".to_string(), "users".to_string()];
        assert_eq!(infer_typename(&path), "User");
    }

    #[test]
    fn infer_typename_handles_edges_node_path() {
        let path = vec![
            "data".to_string(),
            "posts".to_string(),
            "edges".to_string(),
            "node".to_string(),
        ];
        assert_eq!(infer_typename(&path), "Post");
    }

    #[test]
    fn infer_typename_falls_back_to_entity() {
        let path = vec!["data".to_string(), "edges".to_string()];
        assert_eq!(infer_typename(&path), "Entity");
    }
}
