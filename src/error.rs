//! Low-level error types that compose into [`crate::errors::CacheError`].

use std::fmt;

/// Placeholder for normalization failures. Normalization does not reject
/// arbitrary JSON today — an entity with a non-string `id` is simply treated
/// as a non-entity object rather than rejected — but the type exists as an
/// extension point so a future stricter mode has somewhere to report into
/// without changing `CacheError`'s shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeError {}

impl fmt::Display for NormalizeError {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl std::error::Error for NormalizeError {}

/// A parser callback (§6) reported that it could not turn a denormalized
/// tree into the caller's typed data. Carries the callback's message
/// verbatim; `lookup` wraps it as `Failed("Parse error: " + msg)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
