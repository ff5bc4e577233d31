//! Query text lookup. The cache never stores GraphQL query text itself — it
//! only knows query *keys* — so `process_pending` consults a registry to
//! turn a name back into something it can send over the wire.

use std::collections::HashMap;

/// A registered operation's document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredQuery {
    pub query: String,
}

/// Error returned by [`QueryRegistry::get`] for an unregistered name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no query registered under the name {0:?}")]
pub struct UnregisteredQuery(pub String);

/// Maps an operation name to its document text.
pub trait QueryRegistry {
    fn get(&self, name: &str) -> Result<RegisteredQuery, UnregisteredQuery>;
}

/// A fixed, in-memory registry populated once at construction — the
/// common case for a client whose operations are known at build time.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    queries: HashMap<String, String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, query: impl Into<String>) -> Self {
        self.queries.insert(name.into(), query.into());
        self
    }
}

impl QueryRegistry for StaticRegistry {
    fn get(&self, name: &str) -> Result<RegisteredQuery, UnregisteredQuery> {
        self.queries
            .get(name)
            .map(|query| RegisteredQuery {
                query: query.clone(),
            })
            .ok_or_else(|| UnregisteredQuery(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_registry_round_trips_registered_queries() {
        let registry = StaticRegistry::new().register("GetSettings", "query GetSettings { settings { id } }");
        let found = registry.get("GetSettings").unwrap();
        assert_eq!(found.query, "query GetSettings { settings { id } }");
    }

    #[test]
    fn static_registry_errors_on_unknown_name() {
        let registry = StaticRegistry::new();
        assert!(registry.get("Nope").is_err());
    }
}
