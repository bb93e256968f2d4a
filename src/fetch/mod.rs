//! Resource fetching.
//!
//! | Type            | Purpose                                           |
//! |-----------------|---------------------------------------------------|
//! | [`Fetcher`]     | Blocking request → response seam                  |
//! | [`HttpFetcher`] | `ureq`-backed fetcher                             |
//! | [`WorkerPool`]  | Bounded rayon pool for join and background tasks  |

mod http;
mod pool;

pub use http::{FetchOptions, HttpFetcher, MAX_BODY_LEN};
pub use pool::WorkerPool;

use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};

/// Transport-level failures. HTTP error statuses are responses, not errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported url scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("failed to read response body")]
    Io(#[from] std::io::Error),
}

/// Fetches one resource, blocking the calling thread.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}
