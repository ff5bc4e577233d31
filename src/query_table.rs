//! Per-query cache entries and the `Loading`/`Fresh`/`Stale` state machine.

use indexmap::IndexMap;
use tracing::info;
use tracing::warn;

use crate::denormalize::denormalize;
use crate::error::ParseError;
use crate::errors::CacheError;
use crate::json::parse;
use crate::json::stringify;
use crate::json::Json;
use crate::key::query_key;
use crate::normalize::extract;
use crate::normalize::EntityTable;
use crate::normalize::Extracted;

/// The three states a query entry can be in. `Loading` entries may carry no
/// data yet; `Fresh`/`Stale` entries always carry the skeleton stored by the
/// most recent successful `store_query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Fresh,
    Stale,
}

/// A single query's cached skeleton, stored as already-serialized text so
/// that a parse failure can be preserved verbatim rather than discarded.
#[derive(Debug, Clone)]
pub struct QueryEntry {
    pub data: String,
    pub timestamp: i64,
    pub status: QueryStatus,
}

pub type QueryTable = IndexMap<String, QueryEntry>;

/// The outcome of a `lookup` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult<T> {
    Loading,
    Failed(String),
    Data(T),
}

/// Looks up `(name, vars)`: adds the key to `pending_fetches` on a miss
/// (returning `Loading`), returns `Loading` unchanged while already loading,
/// and otherwise denormalizes the stored skeleton against `overlay` and
/// `base` and hands the result to `parser`.
pub fn lookup<T>(
    queries: &QueryTable,
    pending_fetches: &mut indexmap::IndexSet<String>,
    overlay: &EntityTable,
    base: &EntityTable,
    name: &str,
    variables: &Json,
    parser: impl FnOnce(&str) -> Result<T, String>,
) -> QueryResult<T> {
    let key = query_key(name, variables);

    let Some(entry) = queries.get(&key) else {
        pending_fetches.insert(key);
        return QueryResult::Loading;
    };

    if entry.status == QueryStatus::Loading {
        return QueryResult::Loading;
    }

    let skeleton = match parse(&entry.data) {
        Ok(tree) => tree,
        Err(_) => {
            // store_query already preserved an unparseable body verbatim;
            // the parser below will report it, but there's nothing to
            // denormalize against.
            return match parser(&entry.data) {
                Ok(value) => QueryResult::Data(value),
                Err(message) => QueryResult::Failed(failed_message(message)),
            };
        }
    };

    let resolved = denormalize(&skeleton, overlay, base);
    match parser(&stringify(&resolved)) {
        Ok(value) => QueryResult::Data(value),
        Err(message) => QueryResult::Failed(failed_message(message)),
    }
}

/// Renders a parser rejection the way [`CacheError::to_failed_message`]
/// would, so `QueryResult::Failed`'s text and `CacheError`'s never drift
/// apart even though `lookup` itself never constructs or returns a
/// `CacheError`.
fn failed_message(message: String) -> String {
    CacheError::Parse(ParseError::new(message)).to_failed_message()
}

/// Parses `body`, extracts its entities into `entities`, and stores the
/// skeleton as a new `Fresh` entry. On parse failure, stores `body` raw so a
/// later `lookup` can still surface `Failed` via its own parser.
pub fn store_query(
    queries: &mut QueryTable,
    entities: &mut EntityTable,
    name: &str,
    variables: &Json,
    body: &str,
    timestamp: i64,
) {
    let key = query_key(name, variables);

    match parse(body) {
        Ok(tree) => {
            let Extracted {
                entities: extracted,
                skeleton,
            } = extract(&tree);
            crate::merge::merge_tables(entities, extracted);
            queries.insert(
                key,
                QueryEntry {
                    data: stringify(&skeleton),
                    timestamp,
                    status: QueryStatus::Fresh,
                },
            );
            info!(query = %name, status = "fresh", "stored query result");
        }
        Err(e) => {
            warn!(query = %name, error = %e, "response body failed to parse; storing raw");
            queries.insert(
                key,
                QueryEntry {
                    data: body.to_string(),
                    timestamp,
                    status: QueryStatus::Fresh,
                },
            );
        }
    }
}

/// Marks `(name, vars)` as `Loading`, creating an empty entry if absent.
pub fn mark_loading(queries: &mut QueryTable, name: &str, variables: &Json, timestamp: i64) {
    let key = query_key(name, variables);
    match queries.get_mut(&key) {
        Some(entry) => entry.status = QueryStatus::Loading,
        None => {
            queries.insert(
                key,
                QueryEntry {
                    data: String::new(),
                    timestamp,
                    status: QueryStatus::Loading,
                },
            );
        }
    }
}

/// Transitions `(name, vars)` to `Stale` if present; a no-op on a miss.
pub fn mark_stale(queries: &mut QueryTable, name: &str, variables: &Json) {
    let key = query_key(name, variables);
    if let Some(entry) = queries.get_mut(&key) {
        entry.status = QueryStatus::Stale;
    }
}

/// Removes the entry for `(name, vars)`, if any.
pub fn invalidate(queries: &mut QueryTable, name: &str, variables: &Json) {
    let key = query_key(name, variables);
    queries.shift_remove(&key);
}
