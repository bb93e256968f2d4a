//! Warm the response cache for referenced resources.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use url::Url;

use super::resource_attr;
use crate::cache::Cache;
use crate::dom::{Document, NodeId};
use crate::fetch::{Fetcher, WorkerPool};
use crate::http::{HttpRequest, HttpResponse};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};

/// Reserves resources missing from the response cache and fetches them in
/// the background. Never changes the document.
pub struct CacheEnforcementVisitor {
    cache: Arc<dyn Cache<HttpResponse>>,
    fetcher: Arc<dyn Fetcher>,
    pool: Arc<WorkerPool>,
}

impl CacheEnforcementVisitor {
    pub fn new(
        cache: Arc<dyn Cache<HttpResponse>>,
        fetcher: Arc<dyn Fetcher>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            pool,
        }
    }

    fn resource(ctx: &RewriteContext, doc: &Document, node: NodeId) -> Option<Url> {
        let attr = resource_attr(doc, node)?;
        if !ctx.feature.should_rewrite_tag(doc.tag_name(node)?) {
            return None;
        }
        let url = ctx.resolve(doc.attr(node, attr)?)?;
        if !matches!(url.scheme(), "http" | "https") || !ctx.feature.should_rewrite_url(url.as_str())
        {
            return None;
        }
        Some(url)
    }

    /// Fresh successful entry present. Cache errors count as a miss.
    fn is_cached(&self, url: &Url) -> bool {
        match self.cache.get(url.as_str()) {
            Ok(Some(response)) => !response.is_error() && !response.is_stale(),
            Ok(None) => false,
            Err(e) => {
                crate::debug!("cache"; "lookup for {} failed: {}", url, e);
                false
            }
        }
    }
}

impl Visitor for CacheEnforcementVisitor {
    fn name(&self) -> &'static str {
        "cache-enforce"
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        match Self::resource(ctx, doc, node) {
            Some(url) if !self.is_cached(&url) => Ok(VisitStatus::ReserveNode),
            _ => Ok(VisitStatus::Bypass),
        }
    }

    fn revisit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        let mut seen = FxHashSet::default();
        for url in nodes.iter().filter_map(|&n| Self::resource(ctx, doc, n)) {
            if !seen.insert(url.clone()) {
                continue;
            }
            let request = HttpRequest::new(url)
                .with_container(ctx.container.clone())
                .with_gadget(ctx.gadget.clone())
                .with_ignore_cache(ctx.ignore_cache);
            let cache = Arc::clone(&self.cache);
            let fetcher = Arc::clone(&self.fetcher);

            self.pool.spawn(move || {
                let key = request.url.as_str();
                match fetcher.fetch(&request) {
                    Ok(response) if response.is_error() => {
                        crate::debug!("cache"; "not caching {}: status {}", key, response.status);
                    }
                    Ok(response) => {
                        let ttl = response.cache_ttl();
                        if let Err(e) = cache.put(key, response, ttl) {
                            crate::debug!("cache"; "store for {} failed: {}", key, e);
                        }
                    }
                    Err(e) => crate::log!("fetch"; "warming {} failed: {}", key, e),
                }
            });
        }
        crate::debug!("cache"; "scheduled {} background fetches", seen.len());
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::rewrite::{DomWalker, Rewriter};
    use crate::test_support::{StubFetcher, canonical, content};

    struct Fixture {
        cache: Arc<MemoryCache<HttpResponse>>,
        fetcher: Arc<StubFetcher>,
        pool: Arc<WorkerPool>,
        walker: DomWalker,
    }

    fn fixture(fetcher: StubFetcher) -> Fixture {
        let cache = Arc::new(MemoryCache::new(16));
        let fetcher = Arc::new(fetcher);
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let visitor = CacheEnforcementVisitor::new(cache.clone(), fetcher.clone(), pool.clone());
        Fixture {
            cache,
            fetcher,
            pool,
            walker: DomWalker::new(vec![Arc::new(visitor)]),
        }
    }

    const HTML: &str = r#"<img src="http://a.com/1.png"><img src="http://a.com/1.png"><img src="http://a.com/2.png">"#;

    #[test]
    fn test_warms_missing_entries_once() {
        let f = fixture(
            StubFetcher::new()
                .with("http://a.com/1.png", 200, "one")
                .with("http://a.com/2.png", 200, "two"),
        );
        let mut content = content(HTML);
        assert!(!f.walker.rewrite(&canonical(), &mut content).unwrap());
        f.pool.wait_idle();

        let mut requests = f.fetcher.requests();
        requests.sort();
        assert_eq!(requests, ["http://a.com/1.png", "http://a.com/2.png"]);
        assert_eq!(f.cache.len(), 2);
        let cached = f.cache.get("http://a.com/2.png").unwrap().unwrap();
        assert_eq!(cached.body, b"two");
    }

    #[test]
    fn test_fresh_entries_bypass() {
        let f = fixture(StubFetcher::new().with("http://a.com/2.png", 200, "two"));
        f.cache
            .put(
                "http://a.com/1.png",
                HttpResponse::ok("cached"),
                std::time::Duration::from_secs(60),
            )
            .unwrap();

        let mut content = content(HTML);
        f.walker.rewrite(&canonical(), &mut content).unwrap();
        f.pool.wait_idle();
        assert_eq!(f.fetcher.requests(), ["http://a.com/2.png"]);
    }

    #[test]
    fn test_errors_not_cached() {
        let f = fixture(StubFetcher::new().with("http://a.com/1.png", 404, "gone"));
        let mut content = content(HTML);
        f.walker.rewrite(&canonical(), &mut content).unwrap();
        f.pool.wait_idle();
        assert!(f.cache.get("http://a.com/1.png").unwrap().is_none());
        // Unroutable 2.png failed too
        assert!(f.cache.is_empty());
    }
}
