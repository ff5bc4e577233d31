//! A normalized GraphQL client cache with optimistic mutation support.
//!
//! Responses are normalized into a flat entity table keyed by
//! `typename:id`; queries are stored as skeletons that reference entities
//! rather than inlining them, so a mutation to one entity is reflected in
//! every query that referenced it the next time it's read. Mutations can be
//! applied optimistically through an overlay that shadows the entity table
//! until the real response arrives to commit or roll it back.
//!
//! The core (this crate) is a pure, single-threaded, synchronous library:
//! every [`cache::Cache`] operation takes `&self` and returns a new,
//! independent `Cache`. Network I/O is represented as boxed futures
//! ([`fetch::Effect`]) that a host spawns on its own executor — the core
//! never awaits anything itself.

pub mod cache;
pub mod config;
pub mod denormalize;
pub mod error;
pub mod errors;
pub mod fetch;
pub mod json;
pub mod key;
pub mod merge;
pub mod normalize;
pub mod optimistic;
pub mod query_table;
pub mod registry;
pub mod transport;

pub use cache::Cache;
pub use cache::HeaderProvider;
pub use config::CacheConfig;
pub use errors::CacheError;
pub use query_table::QueryResult;
pub use query_table::QueryStatus;
