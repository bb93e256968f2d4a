//! `ureq`-backed [`Fetcher`].

use std::io::Read;
use std::time::Duration;

use super::{FetchError, Fetcher};
use crate::http::{DEFAULT_TTL, HttpRequest, HttpResponse};

/// Largest body accepted (16 MiB).
pub const MAX_BODY_LEN: u64 = 16 * 1024 * 1024;

/// Agent settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
    /// Lifetime of responses without caching headers.
    pub default_ttl: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("gadget-rewriter/", env!("CARGO_PKG_VERSION")).to_owned(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

/// Blocking HTTP fetcher sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    default_ttl: Duration,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build();
        Self {
            agent,
            default_ttl: options.default_ttl,
        }
    }

    fn convert(&self, response: ureq::Response) -> Result<HttpResponse, FetchError> {
        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_owned();
                Some((name, value))
            })
            .collect();

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_LEN + 1)
            .read_to_end(&mut body)?;
        if body.len() as u64 > MAX_BODY_LEN {
            return Err(FetchError::TooLarge {
                limit: MAX_BODY_LEN,
            });
        }

        Ok(HttpResponse::new(status, headers, body, self.default_ttl))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&FetchOptions::default())
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let scheme = request.url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(FetchError::UnsupportedScheme(scheme.to_owned()));
        }

        crate::debug!("fetch"; "GET {}", request.url);
        let mut call = self.agent.get(request.url.as_str());
        if request.ignore_cache {
            call = call.set("Cache-Control", "no-cache");
        }

        match call.call() {
            Ok(response) => self.convert(response),
            // Error statuses are responses, not transport failures
            Err(ureq::Error::Status(_, response)) => self.convert(response),
            Err(ureq::Error::Transport(transport)) => {
                Err(FetchError::Transport(transport.to_string()))
            }
        }
    }
}
