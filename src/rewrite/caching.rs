//! Rewrite result caching.
//!
//! ```text
//! key = blake3(raw content, pipeline fingerprint, context fingerprint)
//! ```
//!
//! Any change to the pipeline composition or to the request context yields a
//! different key, so stale results are never served. Results are stored as
//! complete snapshots once the pipeline has finished.

use std::sync::Arc;
use std::time::Duration;

use super::{
    ContentRewriterRegistry, Flow, Pipeline, RewriteContext, RewriteError, RewriterRegistry,
};
use crate::cache::Cache;
use crate::content::MutableContent;
use crate::utils::hash::ContentHash;

/// Finished rewrite result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRewrite {
    pub content: String,
    pub changed: bool,
}

pub struct CachingRewriterRegistry {
    inner: Arc<RewriterRegistry>,
    cache: Arc<dyn Cache<Arc<CachedRewrite>>>,
    /// Results living shorter than this are not worth storing.
    min_cache_ttl: Duration,
    /// Lifetime when the policy defers to HTTP headers and the request gives
    /// no explicit one.
    default_ttl: Duration,
}

impl CachingRewriterRegistry {
    pub fn new(
        inner: Arc<RewriterRegistry>,
        cache: Arc<dyn Cache<Arc<CachedRewrite>>>,
        min_cache_ttl: Duration,
        default_ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            min_cache_ttl,
            default_ttl,
        }
    }

    pub fn inner(&self) -> &RewriterRegistry {
        &self.inner
    }

    fn ttl(&self, ctx: &RewriteContext) -> Duration {
        ctx.refresh()
            .map_or(self.default_ttl, Duration::from_secs)
    }

    fn key(content: &str, pipeline: &Pipeline, ctx: &RewriteContext) -> String {
        ContentHash::builder()
            .part(content)
            .part(pipeline.fingerprint())
            .part(ctx.fingerprint().as_bytes())
            .finish()
            .to_hex()
    }

    fn cached(&self, key: &str) -> Option<Arc<CachedRewrite>> {
        match self.cache.get(key) {
            Ok(hit) => hit,
            Err(e) => {
                crate::debug!("cache"; "rewrite cache read failed: {}", e);
                None
            }
        }
    }
}

impl ContentRewriterRegistry for CachingRewriterRegistry {
    fn rewrite(
        &self,
        ctx: &RewriteContext,
        container: &str,
        flow: Flow,
        content: &mut MutableContent,
    ) -> Result<bool, RewriteError> {
        let pipeline = self.inner.lookup(container, flow)?;
        let ttl = self.ttl(ctx);
        if ctx.ignore_cache || ttl < self.min_cache_ttl {
            return pipeline.run(ctx, content);
        }

        let key = Self::key(content.content(), &pipeline, ctx);
        if let Some(hit) = self.cached(&key) {
            crate::debug!("cache"; "rewrite hit for {}/{}", container, flow);
            if hit.changed {
                content.set_content(hit.content.clone());
            }
            return Ok(hit.changed);
        }

        let changed = pipeline.run(ctx, content)?;
        let snapshot = Arc::new(CachedRewrite {
            content: content.content().to_owned(),
            changed,
        });
        if let Err(e) = self.cache.put(&key, snapshot, ttl) {
            crate::debug!("cache"; "rewrite cache write failed: {}", e);
        }
        Ok(changed)
    }
}
