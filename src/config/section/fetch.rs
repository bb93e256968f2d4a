//! `[fetch]` and `[cache]` section configuration.
//!
//! ```toml
//! [fetch]
//! workers = 8                 # Background fetch threads
//! timeout = 10                # Seconds per request
//! user_agent = "gadget-rewriter"
//! default_ttl = 300           # Lifetime without caching headers
//!
//! [cache]
//! capacity = 1024             # Entries per in-memory cache
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::fetch::FetchOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub workers: usize,
    pub timeout: u64,
    pub user_agent: String,
    pub default_ttl: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let options = FetchOptions::default();
        Self {
            workers: 8,
            timeout: options.timeout.as_secs(),
            user_agent: options.user_agent,
            default_ttl: options.default_ttl.as_secs(),
        }
    }
}

impl FetchConfig {
    pub const WORKERS: FieldPath = FieldPath::new("fetch.workers");
    pub const TIMEOUT: FieldPath = FieldPath::new("fetch.timeout");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error(Self::WORKERS, "at least one worker is required");
        }
        if self.timeout == 0 {
            diag.error_with_hint(Self::TIMEOUT, "timeout must be positive", "e.g. timeout = 10");
        }
    }

    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            default_ttl: Duration::from_secs(self.default_ttl),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub const CAPACITY: FieldPath = FieldPath::new("cache.capacity");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.capacity == 0 {
            diag.warn(Self::CAPACITY, "zero capacity disables caching");
        }
    }
}
