//! Per-request rewrite context.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::policy::ContentRewriterFeature;
use crate::utils::hash::ContentHash;

/// Everything a rewriter may consult about the current request.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub container: String,
    /// Gadget definition URL; relative references resolve against it.
    pub gadget: Option<Url>,
    pub debug: bool,
    pub nocache: bool,
    /// Run the sanitizing visitor.
    pub sanitize: bool,
    /// Bypass the rewrite result cache.
    pub ignore_cache: bool,
    /// Explicit lifetime for rewritten resources (`refresh`).
    pub cache_ttl: Option<Duration>,
    pub feature: Arc<ContentRewriterFeature>,
}

impl RewriteContext {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            gadget: None,
            debug: false,
            nocache: false,
            sanitize: false,
            ignore_cache: false,
            cache_ttl: None,
            feature: Arc::new(ContentRewriterFeature::default()),
        }
    }

    pub fn with_gadget(mut self, gadget: Url) -> Self {
        self.gadget = Some(gadget);
        self
    }

    pub fn with_feature(mut self, feature: Arc<ContentRewriterFeature>) -> Self {
        self.feature = feature;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_nocache(mut self, nocache: bool) -> Self {
        self.nocache = nocache;
        self
    }

    pub fn with_ignore_cache(mut self, ignore_cache: bool) -> Self {
        self.ignore_cache = ignore_cache;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[inline]
    pub fn base_url(&self) -> Option<&Url> {
        self.gadget.as_ref()
    }

    /// Resolve a reference against the gadget URL. Absolute references
    /// parse on their own; relative ones need a base.
    pub fn resolve(&self, reference: &str) -> Option<Url> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        match &self.gadget {
            Some(base) => base.join(reference).ok(),
            None => Url::parse(reference).ok(),
        }
    }

    /// Lifetime in seconds to request from proxies: the explicit TTL, else
    /// the policy's fixed expiry. `None` defers to upstream headers.
    pub fn refresh(&self) -> Option<u64> {
        self.cache_ttl
            .or_else(|| self.feature.expires().as_duration())
            .map(|ttl| ttl.min(crate::cache::MAX_TTL).as_secs())
    }

    /// Hash of every setting that can change rewrite output.
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::builder()
            .part(&self.container)
            .part(self.gadget.as_ref().map(Url::as_str).unwrap_or_default())
            .part([self.debug as u8, self.nocache as u8, self.sanitize as u8])
            .part(self.refresh().map(|s| s.to_string()).unwrap_or_default())
            .part(self.feature.fingerprint().as_bytes())
            .finish()
    }
}
