//! Proxy and concat URI construction.
//!
//! Both managers build on a per-container base URL and append the common
//! request params in a fixed order:
//!
//! ```text
//! {base}?container=..&gadget=..&debug=0|1&nocache=0|1[&refresh=N]&...
//! ```
//!
//! Values are percent-encoded with everything but ASCII alphanumerics and
//! `-._*` escaped, so `http://a.com/1.js` becomes `http%3A%2F%2Fa.com%2F1.js`.

mod concat;
mod proxy;

pub use concat::{
    ConcatBatch, ConcatData, ConcatSegment, ConcatType, ConcatUriManager, DefaultConcatUriManager,
};
pub use proxy::{DefaultProxyUriManager, ProxyUri, ProxyUriManager};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rustc_hash::FxHashMap;
use url::Url;

use crate::rewrite::RewriteContext;

/// Characters escaped in query values.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

#[inline]
pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Base URLs per container with a fallback.
#[derive(Debug, Clone)]
pub struct UriBases {
    fallback: Url,
    containers: FxHashMap<String, Url>,
}

impl UriBases {
    pub fn new(fallback: Url) -> Self {
        Self {
            fallback,
            containers: FxHashMap::default(),
        }
    }

    pub fn with_container(mut self, container: impl Into<String>, base: Url) -> Self {
        self.containers.insert(container.into(), base);
        self
    }

    pub fn base_for(&self, container: &str) -> &Url {
        self.containers.get(container).unwrap_or(&self.fallback)
    }

    /// Whether `url` points at any configured base (same origin and path).
    pub fn is_base(&self, url: &Url) -> bool {
        std::iter::once(&self.fallback)
            .chain(self.containers.values())
            .any(|base| base.origin() == url.origin() && base.path() == url.path())
    }
}

/// `{base}?container=..&gadget=..&debug=..&nocache=..[&refresh=N]` without a
/// trailing separator.
pub(crate) fn common_prefix(base: &Url, ctx: &RewriteContext) -> String {
    let mut out = base.as_str().to_owned();
    if let Some(fragment) = base.fragment() {
        out.truncate(out.len() - fragment.len() - 1);
    }
    if !(out.ends_with('?') || out.ends_with('&')) {
        out.push(if out.contains('?') { '&' } else { '?' });
    }

    out.push_str("container=");
    out.push_str(&encode(&ctx.container));
    if let Some(gadget) = &ctx.gadget {
        out.push_str("&gadget=");
        out.push_str(&encode(gadget.as_str()));
    }
    out.push_str(if ctx.debug { "&debug=1" } else { "&debug=0" });
    out.push_str(if ctx.nocache { "&nocache=1" } else { "&nocache=0" });
    if let Some(refresh) = ctx.refresh() {
        out.push_str("&refresh=");
        out.push_str(&refresh.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("http://a.com/1.js"), "http%3A%2F%2Fa.com%2F1.js");
        assert_eq!(encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode("x-y_z.*"), "x-y_z.*");
    }

    #[test]
    fn test_common_prefix_separators() {
        let ctx = RewriteContext::new("default");
        let plain = Url::parse("http://proxy/p").unwrap();
        assert_eq!(
            common_prefix(&plain, &ctx),
            "http://proxy/p?container=default&debug=0&nocache=0"
        );

        let with_query = Url::parse("http://proxy/p?v=2").unwrap();
        assert!(common_prefix(&with_query, &ctx).starts_with("http://proxy/p?v=2&container="));

        let open_query = Url::parse("http://proxy/p?").unwrap();
        assert!(common_prefix(&open_query, &ctx).starts_with("http://proxy/p?container="));
    }

    #[test]
    fn test_common_prefix_flags() {
        let ctx = RewriteContext::new("my app")
            .with_gadget(Url::parse("http://g.com/g.xml").unwrap())
            .with_debug(true)
            .with_nocache(true)
            .with_cache_ttl(std::time::Duration::from_secs(30));
        let base = Url::parse("http://proxy/p").unwrap();
        assert_eq!(
            common_prefix(&base, &ctx),
            "http://proxy/p?container=my%20app&gadget=http%3A%2F%2Fg.com%2Fg.xml&debug=1&nocache=1&refresh=30"
        );
    }

    #[test]
    fn test_bases() {
        let bases = UriBases::new(Url::parse("http://proxy/p").unwrap())
            .with_container("other", Url::parse("http://other/p").unwrap());
        assert_eq!(bases.base_for("other").host_str(), Some("other"));
        assert_eq!(bases.base_for("missing").host_str(), Some("proxy"));
        assert!(bases.is_base(&Url::parse("http://proxy/p?url=x").unwrap()));
        assert!(bases.is_base(&Url::parse("http://other/p").unwrap()));
        assert!(!bases.is_base(&Url::parse("http://proxy/q").unwrap()));
    }
}
