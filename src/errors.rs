//! The crate's top-level error type.

use crate::error::ParseError;

/// Errors that can arise from the cache's public API.
///
/// `store_query` deliberately does not return this for a malformed response
/// body — the body is stored raw and the failure resurfaces later as
/// `QueryResult::Failed` from `lookup`. `CacheError` is for the smaller
/// surface of operations where failing loudly is the documented behavior:
/// the strict commit/rollback variants, and anywhere a caller chooses to
/// parse eagerly instead of deferring to `lookup`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// A parser callback rejected an otherwise valid, denormalized tree.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// `commit_optimistic_strict`/`rollback_optimistic_strict` were called
    /// with a `mutation_id` not present in `optimistic_mutations`. The
    /// non-strict `commit_optimistic`/`rollback_optimistic` keep the silent
    /// no-op behavior for this case.
    #[error("unknown mutation id: {0}")]
    UnknownMutation(String),
}

impl CacheError {
    /// Renders the error the way `QueryResult::Failed` expects to see it:
    /// `"Parse error: " + msg` for parser failures, the plain message
    /// otherwise. Keeping this in one place means `QueryResult::Failed`'s
    /// text and `CacheError`'s `Display` can never drift apart.
    pub fn to_failed_message(&self) -> String {
        match self {
            CacheError::Parse(e) => format!("Parse error: {e}"),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_render_with_the_documented_prefix() {
        let err = CacheError::Parse(ParseError::new("missing field `id`"));
        assert_eq!(err.to_failed_message(), "Parse error: missing field `id`");
    }

    #[test]
    fn unknown_mutation_carries_the_id() {
        let err = CacheError::UnknownMutation("m-1".to_string());
        assert_eq!(err.to_string(), "unknown mutation id: m-1");
    }
}
