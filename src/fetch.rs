//! Turns pending cache misses and optimistic mutations into dispatchable
//! effects: boxed futures the host spawns on whatever executor it already
//! runs, decoupling the core from any particular async runtime.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;
use tracing::info;

use crate::cache::Cache;
use crate::json::Json;
use crate::key::split_query_key;
use crate::registry::QueryRegistry;
use crate::transport::GraphQLRequest;
use crate::transport::Transport;

/// A detached unit of work produced by [`process_pending`] or
/// [`execute_optimistic_mutation`]. The host spawns it on its own executor;
/// the cache core never polls it itself.
pub type Effect = BoxFuture<'static, ()>;

/// Dispatched once an effect's network round trip completes.
pub type OnFetchResponse = Arc<dyn Fn(String, Json, Result<String, String>) + Send + Sync>;

/// Dispatched once an optimistic mutation's network round trip completes.
/// Carries the mutation id, the caller's `parser` applied to the response
/// body (or the transport error, on a network failure), and the raw body
/// itself so the host can still call `commit_optimistic`/`rollback_optimistic`
/// even when `parser` rejected the body.
pub type OnMutationResponse<T> = Arc<dyn Fn(String, Result<T, String>, String) + Send + Sync>;

/// Drains `cache`'s pending fetches into effects, transitioning every
/// drained key to `Loading`. Keys whose query name is not registered are
/// dropped silently (logged at `info!`, not surfaced as an error — see the
/// open question this behavior resolves).
pub fn process_pending(
    cache: &Cache,
    registry: Arc<dyn QueryRegistry + Send + Sync>,
    transport: Arc<dyn Transport>,
    on_response: OnFetchResponse,
    clock: impl Fn() -> i64,
) -> (Cache, Vec<Effect>) {
    let mut next = cache.clone();
    let pending: Vec<String> = next.pending_fetches().iter().cloned().collect();
    debug!(pending = pending.len(), "draining pending fetches");

    let mut effects = Vec::with_capacity(pending.len());

    for key in &pending {
        let Some((name, variables_json)) = split_query_key(key) else {
            continue;
        };
        let name = name.to_string();
        let variables: Json = crate::json::parse(variables_json).unwrap_or(Json::Null);

        let query = match registry.get(&name) {
            Ok(registered) => registered.query,
            Err(_) => {
                info!(query = %name, "dropping pending fetch for unregistered query");
                continue;
            }
        };

        let endpoint = next.endpoint().to_string();
        let header_provider = next.header_provider().clone();
        let default_headers = next.default_headers().to_vec();
        let transport = transport.clone();
        let on_response = on_response.clone();
        let name_for_effect = name.clone();
        let variables_for_effect = variables.clone();

        effects.push(
            async move {
                let dynamic_headers = (header_provider)();
                let headers = crate::cache::merge_headers(&default_headers, dynamic_headers);
                let request = GraphQLRequest {
                    query,
                    variables: variables_for_effect.clone(),
                };
                let outcome = transport.send(&endpoint, request, headers).await;
                on_response(name_for_effect, variables_for_effect, outcome);
            }
            .boxed(),
        );
    }

    let timestamp = clock();
    for key in &pending {
        if let Some((name, variables_json)) = split_query_key(key) {
            let variables: Json = crate::json::parse(variables_json).unwrap_or(Json::Null);
            next = next.mark_loading(name, &variables, timestamp);
        }
    }
    *next.pending_fetches_mut() = Default::default();

    (next, effects)
}

/// Allocates a mutation id, applies the optimistic update, and builds the
/// effect that performs the mutation's network round trip. `parser` is
/// applied to the response body inside the effect, the same way a query
/// result is parsed in [`crate::cache::Cache::lookup`], so the host's
/// `on_response` receives already-typed data rather than a raw body. The
/// host calls `commit_optimistic`/`rollback_optimistic` from inside
/// `on_response` based on the outcome it receives.
pub fn execute_optimistic_mutation<T: Send + 'static>(
    cache: &Cache,
    registry: Arc<dyn QueryRegistry + Send + Sync>,
    transport: Arc<dyn Transport>,
    name: &str,
    variables: Json,
    entity_key: &str,
    updater: impl FnOnce(Option<&Json>) -> Json,
    parser: impl FnOnce(&str) -> Result<T, String> + Send + 'static,
    on_response: OnMutationResponse<T>,
) -> Result<(Cache, String, Effect), crate::registry::UnregisteredQuery> {
    let query = registry.get(name)?.query;

    let mut next = cache.clone();
    let mutation_id = next.next_mutation_id();
    let next = next.apply_optimistic_update(&mutation_id, entity_key, updater);

    let endpoint = next.endpoint().to_string();
    let header_provider = next.header_provider().clone();
    let default_headers = next.default_headers().to_vec();
    let mutation_id_for_effect = mutation_id.clone();

    let effect = async move {
        let dynamic_headers = (header_provider)();
        let headers = crate::cache::merge_headers(&default_headers, dynamic_headers);
        let request = GraphQLRequest { query, variables };
        let outcome = transport.send(&endpoint, request, headers).await;
        match outcome {
            Ok(body) => {
                let parsed = parser(&body);
                on_response(mutation_id_for_effect, parsed, body);
            }
            Err(message) => on_response(mutation_id_for_effect, Err(message), String::new()),
        }
    }
    .boxed();

    Ok((next, mutation_id, effect))
}
