//! Wiring from a loaded config to ready-to-use registries.
//!
//! ```text
//! RewriterConfig
//!     ├── uri      → proxy / concat managers
//!     ├── fetch    → HttpFetcher + WorkerPool
//!     ├── cache    → response cache + rewrite result cache
//!     └── rewrite  → ContainerFeatureProvider
//!                         │
//!                         ▼
//!      RewriterRegistry ◄── stock pipelines for every flow
//!             │
//!             ▼
//!      CachingRewriterRegistry
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use super::RewriteArgs;
use crate::cache::MemoryCache;
use crate::config::RewriterConfig;
use crate::dom::{Html5everParser, HtmlParser};
use crate::fetch::{HttpFetcher, WorkerPool};
use crate::policy::{ContainerFeatureProvider, FeatureProvider, GadgetOverrides};
use crate::rewrite::pipelines::{Services, register_standard};
use crate::rewrite::{CachingRewriterRegistry, DEFAULT_CONTAINER, RewriteContext, RewriterRegistry};
use crate::uri::{DefaultConcatUriManager, DefaultProxyUriManager};

pub struct Runtime {
    pub config: RewriterConfig,
    pub services: Services,
    pub registry: Arc<RewriterRegistry>,
    pub cached: CachingRewriterRegistry,
    pub features: ContainerFeatureProvider,
    pub parser: Arc<dyn HtmlParser>,
}

impl Runtime {
    pub fn new(config: RewriterConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.fetch.workers).context("failed to start fetch workers")?;
        let services = Services {
            proxy: Arc::new(DefaultProxyUriManager::new(config.proxy_bases()?)),
            concat: Arc::new(DefaultConcatUriManager::new(config.concat_bases()?)),
            responses: Arc::new(MemoryCache::new(config.cache.capacity)),
            fetcher: Arc::new(HttpFetcher::new(&config.fetch.options())),
            pool: Arc::new(pool),
        };

        let registry = Arc::new(RewriterRegistry::new());
        register_standard(&registry, DEFAULT_CONTAINER, &services);

        let cached = CachingRewriterRegistry::new(
            Arc::clone(&registry),
            Arc::new(MemoryCache::new(config.cache.capacity)),
            config.min_cache_ttl(),
            config.default_ttl(),
        );

        Ok(Self {
            features: config.feature_provider(),
            services,
            registry,
            cached,
            parser: Arc::new(Html5everParser::new()),
            config,
        })
    }

    /// Request context for one `rewrite` invocation.
    pub fn context(&self, args: &RewriteArgs) -> RewriteContext {
        let overrides =
            GadgetOverrides::from_params(args.params.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        let mut ctx = RewriteContext::new(args.container.as_str())
            .with_feature(self.features.feature(&args.container, &overrides))
            .with_sanitize(args.sanitize)
            .with_debug(args.debug)
            .with_nocache(args.nocache)
            .with_ignore_cache(args.ignore_cache);
        if let Some(gadget) = &args.gadget {
            ctx = ctx.with_gadget(gadget.clone());
        }
        if let Some(secs) = args.refresh {
            ctx = ctx.with_cache_ttl(Duration::from_secs(secs));
        }
        ctx
    }

    /// Wait for background fetches (cache warming) to finish.
    pub fn shutdown(&self) {
        self.services.pool.wait_idle();
    }
}
