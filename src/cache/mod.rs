//! Keyed caches for fetched responses and rewrite results.
//!
//! | Type            | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | [`Cache`]       | Fallible get/put/remove keyed by string        |
//! | [`MemoryCache`] | In-process cache with TTL and a capacity bound |
//!
//! Callers treat every error as a miss; a broken cache never fails a rewrite.

mod memory;

pub use memory::{DEFAULT_CAPACITY, MemoryCache};

use std::time::Duration;

/// Longest lifetime any cache entry or computed expiry may have.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

use thiserror::Error;

/// Cache backend failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("entry `{0}` rejected by cache")]
    Rejected(String),
}

/// Shared string-keyed cache. Values are complete snapshots; writers race
/// last-writer-wins.
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<V>, CacheError>;

    fn put(&self, key: &str, value: V, ttl: Duration) -> Result<(), CacheError>;

    fn remove(&self, key: &str) -> Result<(), CacheError>;
}
