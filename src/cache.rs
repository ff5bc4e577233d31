//! The `Cache` value: an immutable snapshot of entity state, the optimistic
//! overlay, and per-query status, plus the operations that derive a new
//! snapshot from an old one.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::config::CacheConfig;
use crate::config::Clock;
use crate::errors::CacheError;
use crate::json::Json;
use crate::key::query_key;
use crate::normalize::EntityTable;
use crate::optimistic;
use crate::optimistic::MutationTable;
use crate::query_table;
use crate::query_table::QueryResult;
use crate::query_table::QueryTable;

/// Merges `default_headers` under `dynamic_headers`, with `dynamic_headers`
/// winning on conflicting names — the order a caller's header provider can
/// still override a configured default (e.g. a token refreshed after the
/// cache was built).
pub fn merge_headers(
    default_headers: &[(String, String)],
    dynamic_headers: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged = default_headers.to_vec();
    for (name, value) in dynamic_headers {
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => merged.push((name, value)),
        }
    }
    merged
}

/// Produces the dynamic headers to attach to outgoing requests, invoked at
/// effect-execution time so that host-side credential changes (token
/// refresh, re-auth) take effect without reconstructing the cache.
pub type HeaderProvider = Arc<dyn Fn() -> Vec<(String, String)> + Send + Sync>;

/// An immutable snapshot of cache state. Every operation takes `&self` and
/// returns an owned `Cache`; only the maps an operation actually touches are
/// cloned; the rest are shared via `Clone` on the underlying map types. No
/// persistent/structural-sharing map crate is pulled in — the working sets
/// involved in a single response are small enough that an ordinary clone is
/// cheap, and pulling in something like `im` would add a dependency outside
/// the established stack for no measurable benefit here.
#[derive(Clone)]
pub struct Cache {
    endpoint: String,
    entities: EntityTable,
    optimistic_entities: EntityTable,
    optimistic_mutations: MutationTable,
    queries: QueryTable,
    pending_fetches: IndexSet<String>,
    header_provider: HeaderProvider,
    mutation_counter: u64,
    default_headers: Vec<(String, String)>,
    stale_on_commit: bool,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("endpoint", &self.endpoint)
            .field("entities", &self.entities)
            .field("optimistic_entities", &self.optimistic_entities)
            .field("optimistic_mutations", &self.optimistic_mutations)
            .field("queries", &self.queries)
            .field("pending_fetches", &self.pending_fetches)
            .field("header_provider", &"<fn>")
            .field("mutation_counter", &self.mutation_counter)
            .field("default_headers", &self.default_headers)
            .field("stale_on_commit", &self.stale_on_commit)
            .finish()
    }
}

impl Cache {
    /// Creates an empty cache targeting `endpoint`, with no default headers.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::new_with_headers(endpoint, Arc::new(Vec::new))
    }

    /// Creates an empty cache targeting `endpoint`, using `header_provider`
    /// to produce request headers at fetch time.
    pub fn new_with_headers(endpoint: impl Into<String>, header_provider: HeaderProvider) -> Self {
        Self {
            endpoint: endpoint.into(),
            entities: EntityTable::new(),
            optimistic_entities: EntityTable::new(),
            optimistic_mutations: MutationTable::new(),
            queries: QueryTable::new(),
            pending_fetches: IndexSet::new(),
            header_provider,
            mutation_counter: 0,
            default_headers: Vec::new(),
            stale_on_commit: true,
        }
    }

    /// Creates a cache from a [`CacheConfig`]: `config.default_headers` is
    /// stored for merging under `header_provider`'s dynamic headers at
    /// request time (see [`merge_headers`]; dynamic headers win on
    /// conflicting names), and `config.stale_on_commit` becomes the default
    /// consulted by [`Cache::commit_optimistic_default`].
    pub fn from_config(config: CacheConfig, header_provider: HeaderProvider) -> Self {
        Self {
            endpoint: config.endpoint,
            entities: EntityTable::new(),
            optimistic_entities: EntityTable::new(),
            optimistic_mutations: MutationTable::new(),
            queries: QueryTable::new(),
            pending_fetches: IndexSet::new(),
            header_provider,
            mutation_counter: 0,
            default_headers: config.default_headers,
            stale_on_commit: config.stale_on_commit,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn header_provider(&self) -> &HeaderProvider {
        &self.header_provider
    }

    /// Default headers configured via [`CacheConfig`], merged under the
    /// header provider's dynamic output at effect-build time.
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Looks up `(name, variables)`. See [`crate::query_table::lookup`].
    pub fn lookup<T>(
        &self,
        name: &str,
        variables: &Json,
        parser: impl FnOnce(&str) -> Result<T, String>,
    ) -> (Cache, QueryResult<T>) {
        let mut next = self.clone();
        let result = query_table::lookup(
            &next.queries,
            &mut next.pending_fetches,
            &next.optimistic_entities,
            &next.entities,
            name,
            variables,
            parser,
        );
        (next, result)
    }

    /// Stores a query response. See [`crate::query_table::store_query`].
    pub fn store_query(
        &self,
        name: &str,
        variables: &Json,
        body: &str,
        timestamp: i64,
    ) -> Cache {
        let mut next = self.clone();
        query_table::store_query(
            &mut next.queries,
            &mut next.entities,
            name,
            variables,
            body,
            timestamp,
        );
        next
    }

    /// Convenience over [`Cache::store_query`] for hosts that would
    /// otherwise thread a timestamp through by hand: asks `clock` for the
    /// current time instead of taking one as an argument.
    pub fn store_query_now(
        &self,
        name: &str,
        variables: &Json,
        body: &str,
        clock: &dyn Clock,
    ) -> Cache {
        self.store_query(name, variables, body, clock.now())
    }

    pub fn mark_loading(&self, name: &str, variables: &Json, timestamp: i64) -> Cache {
        let mut next = self.clone();
        query_table::mark_loading(&mut next.queries, name, variables, timestamp);
        next
    }

    pub fn mark_stale(&self, name: &str, variables: &Json) -> Cache {
        let mut next = self.clone();
        query_table::mark_stale(&mut next.queries, name, variables);
        next
    }

    pub fn invalidate(&self, name: &str, variables: &Json) -> Cache {
        let mut next = self.clone();
        query_table::invalidate(&mut next.queries, name, variables);
        next
    }

    /// Drops every query entry and pending fetch, keeping entity data.
    pub fn clear(&self) -> Cache {
        let mut next = self.clone();
        next.queries = QueryTable::new();
        next.pending_fetches = IndexSet::new();
        next
    }

    /// Applies an optimistic update. See
    /// [`crate::optimistic::apply_optimistic_update`].
    pub fn apply_optimistic_update(
        &self,
        mutation_id: &str,
        entity_key: &str,
        updater: impl FnOnce(Option<&Json>) -> Json,
    ) -> Cache {
        let mut next = self.clone();
        optimistic::apply_optimistic_update(
            &mut next.optimistic_entities,
            &mut next.optimistic_mutations,
            &next.entities,
            mutation_id,
            entity_key,
            updater,
        );
        next
    }

    pub fn rollback_optimistic(&self, mutation_id: &str) -> Cache {
        let mut next = self.clone();
        optimistic::rollback_optimistic(
            &mut next.optimistic_entities,
            &mut next.optimistic_mutations,
            mutation_id,
        );
        next
    }

    /// Commits an optimistic mutation. See
    /// [`crate::optimistic::commit_optimistic`]. When `stale_on_commit` is
    /// set, every query entry is also marked `Stale` so the host can choose
    /// to refresh it in the background.
    pub fn commit_optimistic(
        &self,
        mutation_id: &str,
        response_body: &str,
        stale_on_commit: bool,
    ) -> Cache {
        let mut next = self.clone();
        optimistic::commit_optimistic(
            &mut next.optimistic_entities,
            &mut next.optimistic_mutations,
            &mut next.entities,
            mutation_id,
            response_body,
        );
        if stale_on_commit {
            for entry in next.queries.values_mut() {
                entry.status = crate::query_table::QueryStatus::Stale;
            }
        }
        next
    }

    /// [`Cache::commit_optimistic`] using the `stale_on_commit` default
    /// carried in from [`CacheConfig`] (or `true`, for caches built with
    /// [`Cache::new`]/[`Cache::new_with_headers`]).
    pub fn commit_optimistic_default(&self, mutation_id: &str, response_body: &str) -> Cache {
        self.commit_optimistic(mutation_id, response_body, self.stale_on_commit)
    }

    /// Like [`Cache::commit_optimistic`], but `Err(CacheError::UnknownMutation)`
    /// instead of a silent no-op when `mutation_id` isn't outstanding.
    pub fn commit_optimistic_strict(
        &self,
        mutation_id: &str,
        response_body: &str,
        stale_on_commit: bool,
    ) -> Result<Cache, CacheError> {
        if !self.optimistic_mutations.contains_key(mutation_id) {
            return Err(CacheError::UnknownMutation(mutation_id.to_string()));
        }
        Ok(self.commit_optimistic(mutation_id, response_body, stale_on_commit))
    }

    /// Like [`Cache::rollback_optimistic`], but `Err(CacheError::UnknownMutation)`
    /// instead of a silent no-op when `mutation_id` isn't outstanding.
    pub fn rollback_optimistic_strict(&self, mutation_id: &str) -> Result<Cache, CacheError> {
        if !self.optimistic_mutations.contains_key(mutation_id) {
            return Err(CacheError::UnknownMutation(mutation_id.to_string()));
        }
        Ok(self.rollback_optimistic(mutation_id))
    }

    pub fn has_pending_mutations(&self) -> bool {
        optimistic::has_pending_mutations(&self.optimistic_mutations)
    }

    pub fn pending_fetches(&self) -> &IndexSet<String> {
        &self.pending_fetches
    }

    pub(crate) fn pending_fetches_mut(&mut self) -> &mut IndexSet<String> {
        &mut self.pending_fetches
    }

    pub(crate) fn next_mutation_id(&mut self) -> String {
        let id = format!("mutation-{}", self.mutation_counter);
        self.mutation_counter += 1;
        id
    }

    /// Value currently visible for `entity_key` in the query whose key this
    /// is: overlay first, then base. Exposed for optimistic-update callers
    /// who want to read the starting point outside the `updater` closure.
    pub fn visible_entity(&self, entity_key: &str) -> Option<&Json> {
        self.optimistic_entities
            .get(entity_key)
            .or_else(|| self.entities.get(entity_key))
    }

    /// Key under which `(name, variables)` is stored, exposed for hosts that
    /// need to correlate a dispatched effect back to a query entry.
    pub fn key_for(name: &str, variables: &Json) -> String {
        query_key(name, variables)
    }
}
