//! HTTP value objects exchanged with fetchers and caches.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use url::Url;

use crate::cache::MAX_TTL;

/// Lifetime used when a response carries no caching headers.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Outbound fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: Url,
    pub container: String,
    pub gadget: Option<Url>,
    pub ignore_cache: bool,
}

impl HttpRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            container: String::new(),
            gadget: None,
            ignore_cache: false,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_gadget(mut self, gadget: Option<Url>) -> Self {
        self.gadget = gadget;
        self
    }

    pub fn with_ignore_cache(mut self, ignore_cache: bool) -> Self {
        self.ignore_cache = ignore_cache;
        self
    }
}

/// Fetched response. Header names are stored lowercase.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub fetched_at: Instant,
    ttl: Duration,
}

impl HttpResponse {
    /// Build a response; the lifetime is derived from `Cache-Control`,
    /// falling back to `default_ttl`.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>, default_ttl: Duration) -> Self {
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        let ttl = headers
            .iter()
            .find(|(name, _)| name == "cache-control")
            .map_or(default_ttl, |(_, value)| cache_control_ttl(value, default_ttl));
        Self {
            status,
            headers,
            body,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    /// 200 response with a body and the default lifetime.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, Vec::new(), body.into(), DEFAULT_TTL)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Remaining lifetime is zero.
    pub fn is_stale(&self) -> bool {
        self.fetched_at.elapsed() >= self.ttl
    }

    /// Lifetime granted at fetch time.
    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// `max-age` wins, capped at [`MAX_TTL`]; `no-cache`/`no-store` mean zero.
fn cache_control_ttl(value: &str, default_ttl: Duration) -> Duration {
    let mut ttl = default_ttl;
    for directive in value.split(',').map(str::trim) {
        let lower = directive.to_ascii_lowercase();
        if lower == "no-cache" || lower == "no-store" {
            return Duration::ZERO;
        }
        if let Some(secs) = lower.strip_prefix("max-age=")
            && let Ok(secs) = secs.trim_matches('"').parse::<u64>()
        {
            ttl = Duration::from_secs(secs).min(MAX_TTL);
        }
    }
    ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> Vec<(String, String)> {
        vec![("Cache-Control".to_string(), value.to_string())]
    }

    #[test]
    fn test_ttl_from_headers() {
        let response = HttpResponse::new(200, headers("public, max-age=60"), Vec::new(), DEFAULT_TTL);
        assert_eq!(response.cache_ttl(), Duration::from_secs(60));
        assert_eq!(response.header("cache-control"), Some("public, max-age=60"));

        let response = HttpResponse::new(200, headers("no-store"), Vec::new(), DEFAULT_TTL);
        assert_eq!(response.cache_ttl(), Duration::ZERO);
        assert!(response.is_stale());

        let response = HttpResponse::new(200, Vec::new(), Vec::new(), Duration::from_secs(9));
        assert_eq!(response.cache_ttl(), Duration::from_secs(9));
        assert!(!response.is_stale());
    }

    #[test]
    fn test_huge_max_age_clamped() {
        let response = HttpResponse::new(
            200,
            headers("max-age=18446744073709551615"),
            Vec::new(),
            DEFAULT_TTL,
        );
        assert_eq!(response.cache_ttl(), MAX_TTL);
        assert!(!response.is_stale());
    }

    #[test]
    fn test_error_status() {
        assert!(HttpResponse::new(404, Vec::new(), Vec::new(), DEFAULT_TTL).is_error());
        assert!(!HttpResponse::ok("x").is_error());
    }

    #[test]
    fn test_body_text_is_lossy() {
        let response = HttpResponse::ok(vec![b'a', 0xFF, b'b']);
        assert_eq!(response.body_text(), "a\u{FFFD}b");
    }

    #[test]
    fn test_request_builder() {
        let url = Url::parse("http://a.com/x").unwrap();
        let request = HttpRequest::new(url.clone())
            .with_container("c")
            .with_ignore_cache(true);
        assert_eq!(request.url, url);
        assert_eq!(request.container, "c");
        assert!(request.ignore_cache);
        assert!(request.gadget.is_none());
    }
}
