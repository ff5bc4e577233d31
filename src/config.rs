//! Typed configuration layered on top of the config-free constructors named
//! in the data model: `Cache::new`/`Cache::new_with_headers` remain the
//! direct entry points; `CacheConfig` is sugar for callers who want the
//! extra knobs.

/// Configuration for a [`crate::cache::Cache`], built with
/// [`CacheConfig::builder`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub endpoint: String,
    pub default_headers: Vec<(String, String)>,
    pub stale_on_commit: bool,
}

impl CacheConfig {
    pub fn builder(endpoint: impl Into<String>) -> CacheConfigBuilder {
        CacheConfigBuilder {
            endpoint: endpoint.into(),
            default_headers: Vec::new(),
            stale_on_commit: true,
        }
    }
}

/// Fluent builder for [`CacheConfig`]. `endpoint` is the only required
/// field; everything else has a spec-documented default.
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    endpoint: String,
    default_headers: Vec<(String, String)>,
    stale_on_commit: bool,
}

impl CacheConfigBuilder {
    /// Adds a default header, merged under whatever the header provider
    /// supplies at request time (dynamic headers win on name conflicts).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Whether `commit_optimistic` also marks the owning query entries
    /// `Stale`. Defaults to `true`. This is additive: base `commit_optimistic`
    /// semantics are unaffected when this is `false`.
    pub fn stale_on_commit(mut self, stale_on_commit: bool) -> Self {
        self.stale_on_commit = stale_on_commit;
        self
    }

    pub fn build(self) -> CacheConfig {
        CacheConfig {
            endpoint: self.endpoint,
            default_headers: self.default_headers,
            stale_on_commit: self.stale_on_commit,
        }
    }
}

/// Supplies a timestamp for convenience constructors that don't want to
/// thread one through by hand. Core operations (`store_query`, `mark_loading`)
/// always accept an explicit timestamp and never call a clock themselves.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// A [`Clock`] backed by a plain function pointer, for hosts that don't need
/// an injected object (e.g. tests supplying a fixed value).
impl Clock for fn() -> i64 {
    fn now(&self) -> i64 {
        (self)()
    }
}
