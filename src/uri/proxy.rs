//! Proxy URI construction.

use url::Url;

use super::{UriBases, common_prefix, encode};
use crate::rewrite::RewriteContext;

/// A resource to route through the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUri {
    pub url: Url,
    /// Tag the reference was found on, when known.
    pub tag: Option<String>,
}

impl ProxyUri {
    pub fn new(url: Url) -> Self {
        Self { url, tag: None }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Builds proxied URLs in batches.
pub trait ProxyUriManager: Send + Sync {
    /// One result per input, in input order. `None` declines that resource.
    fn batch_build_proxy_uris(&self, ctx: &RewriteContext, resources: &[ProxyUri])
    -> Vec<Option<Url>>;

    /// Whether `url` already points at the proxy.
    fn is_proxied(&self, url: &Url) -> bool;
}

/// `{base}?container=..&gadget=..&debug=..&nocache=..[&refresh=N]&url=..`
#[derive(Debug, Clone)]
pub struct DefaultProxyUriManager {
    bases: UriBases,
}

impl DefaultProxyUriManager {
    pub fn new(bases: UriBases) -> Self {
        Self { bases }
    }

    fn build(&self, ctx: &RewriteContext, resource: &ProxyUri) -> Option<Url> {
        let scheme = resource.url.scheme();
        if scheme != "http" && scheme != "https" {
            return None;
        }
        let mut uri = common_prefix(self.bases.base_for(&ctx.container), ctx);
        uri.push_str("&url=");
        uri.push_str(&encode(resource.url.as_str()));
        Url::parse(&uri).ok()
    }
}

impl ProxyUriManager for DefaultProxyUriManager {
    fn batch_build_proxy_uris(
        &self,
        ctx: &RewriteContext,
        resources: &[ProxyUri],
    ) -> Vec<Option<Url>> {
        resources.iter().map(|r| self.build(ctx, r)).collect()
    }

    fn is_proxied(&self, url: &Url) -> bool {
        self.bases.is_base(url)
    }
}
