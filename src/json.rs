//! The JSON value model every cache operation is defined over.
//!
//! We reuse [`serde_json_bytes::Value`] rather than hand-rolling another JSON
//! enum: it already gives us the tagged-variant shape the cache needs (null,
//! bool, number, string, array, object) and, with the `preserve_order`
//! feature, an object map that iterates in insertion order without attaching
//! any meaning to that order — exactly the "stable but irrelevant" ordering
//! the normalizer and denormalizer rely on when rebuilding trees.

use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value;

/// Alias used throughout the crate so call sites read in domain terms
/// ("a `Json` tree") rather than the backing crate's name.
pub type Json = Value;

/// An object-typed `Json` value. Entities and skeletons are always this
/// shape; scalars and arrays never carry a `{__ref: ...}` sentinel.
pub type JsonMap = Map<ByteString, Value>;

/// The sentinel field name of a reference placeholder.
pub const REF_FIELD: &str = "__ref";

/// Builds the reference placeholder `{__ref: entity_key}`.
pub fn make_reference(entity_key: &str) -> Json {
    let mut map = JsonMap::new();
    map.insert(REF_FIELD, Json::String(entity_key.into()));
    Json::Object(map)
}

/// If `value` is a reference placeholder (an object with exactly one field,
/// `__ref`, holding a string), returns the referenced entity key.
///
/// An object that merely happens to contain a `__ref` field alongside others
/// is not a reference — extraction never produces those, so an object with
/// extra fields is always real data a caller deliberately named `__ref`.
pub fn as_reference(value: &Json) -> Option<&str> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(REF_FIELD)?.as_str()
}

/// Serializes `value` to a canonical string form: object keys are sorted so
/// that two variable sets which are logically equal (same keys and values,
/// different insertion order) always produce the same query key.
///
/// `serde_json_bytes::Map` preserves insertion order, so sorting happens here
/// rather than being an incidental property of the map type.
pub fn canonical_json(value: &Json) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Json, out: &mut String) {
    match value {
        Json::Object(map) => {
            let mut entries: Vec<(&str, &Json)> =
                map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            entries.sort_unstable_by_key(|(k, _)| *k);
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Json::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already serialize deterministically; lean on serde_json
        // rather than re-implementing number/string escaping.
        other => {
            if let Ok(s) = serde_json::to_string(other) {
                out.push_str(&s);
            }
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    // Reuse serde_json's escaping rather than hand-rolling it.
    if let Ok(encoded) = serde_json::to_string(s) {
        out.push_str(&encoded);
    }
}

/// Parses a response body into a [`Json`] tree.
pub fn parse(body: &str) -> Result<Json, serde_json::Error> {
    serde_json::from_str(body)
}

/// Serializes a [`Json`] tree back to a string, e.g. before handing it to a
/// parser callback that only understands raw text.
pub fn stringify(value: &Json) -> String {
    // serde_json_bytes::Value implements Serialize directly.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
