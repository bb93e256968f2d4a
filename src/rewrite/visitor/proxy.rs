//! Route resource loads through the proxy.

use std::sync::Arc;

use url::Url;

use super::resource_attr;
use crate::dom::{Document, NodeId};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};
use crate::uri::{ProxyUri, ProxyUriManager};

/// Reserves resource-bearing elements and rewrites their URL to the proxy
/// in one batch.
pub struct ProxyingVisitor {
    manager: Arc<dyn ProxyUriManager>,
}

impl ProxyingVisitor {
    pub fn new(manager: Arc<dyn ProxyUriManager>) -> Self {
        Self { manager }
    }

    /// Resource URL of a node that should be proxied.
    fn eligible(&self, ctx: &RewriteContext, doc: &Document, node: NodeId) -> Option<(&'static str, Url)> {
        let attr = resource_attr(doc, node)?;
        let tag = doc.tag_name(node)?;
        if !ctx.feature.should_rewrite_tag(tag) {
            return None;
        }
        let url = ctx.resolve(doc.attr(node, attr)?)?;
        if !matches!(url.scheme(), "http" | "https")
            || self.manager.is_proxied(&url)
            || !ctx.feature.should_rewrite_url(url.as_str())
        {
            return None;
        }
        Some((attr, url))
    }
}

impl Visitor for ProxyingVisitor {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        Ok(match self.eligible(ctx, doc, node) {
            Some(_) => VisitStatus::ReserveNode,
            None => VisitStatus::Bypass,
        })
    }

    fn revisit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        // Earlier rewriters may have changed a reserved node since the walk
        let targets: Vec<(NodeId, &'static str, ProxyUri)> = nodes
            .iter()
            .filter_map(|&node| {
                let (attr, url) = self.eligible(ctx, doc, node)?;
                let tag = doc.tag_name(node).unwrap_or_default();
                Some((node, attr, ProxyUri::new(url).with_tag(tag)))
            })
            .collect();
        if targets.is_empty() {
            return Ok(false);
        }

        let resources: Vec<ProxyUri> = targets.iter().map(|(_, _, r)| r.clone()).collect();
        let built = self.manager.batch_build_proxy_uris(ctx, &resources);

        let mut changed = false;
        for ((node, attr, _), proxied) in targets.into_iter().zip(built) {
            if let Some(proxied) = proxied {
                doc.set_attr(node, attr, proxied.as_str())?;
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FeatureDefaults;
    use crate::rewrite::{DomWalker, Rewriter};
    use crate::test_support::{body_html, canonical, content, ctx_with, gadget_ctx, proxy_manager};
    use parking_lot::Mutex;

    /// Declines every other resource and records batch sizes.
    struct Alternating {
        batches: Mutex<Vec<usize>>,
    }

    impl ProxyUriManager for Alternating {
        fn batch_build_proxy_uris(
            &self,
            _ctx: &RewriteContext,
            resources: &[ProxyUri],
        ) -> Vec<Option<Url>> {
            self.batches.lock().push(resources.len());
            resources
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    (i % 2 == 0).then(|| Url::parse(&format!("http://p{}", r.url.path())).unwrap())
                })
                .collect()
        }

        fn is_proxied(&self, url: &Url) -> bool {
            url.host_str() == Some("p")
        }
    }

    fn run(ctx: &RewriteContext, html: &str) -> (bool, String) {
        let walker = DomWalker::new(vec![Arc::new(ProxyingVisitor::new(proxy_manager()))]);
        let mut content = content(html);
        let changed = walker.rewrite(ctx, &mut content).unwrap();
        (changed, body_html(&mut content))
    }

    #[test]
    fn test_proxies_images() {
        let (changed, body) = run(&canonical(), r#"<img src="http://a.com/x.png">"#);
        assert!(changed);
        assert_eq!(
            body,
            r#"<img src="http://proxy/proxy?container=default&amp;debug=0&amp;nocache=0&amp;url=http%3A%2F%2Fa.com%2Fx.png">"#
        );
    }

    #[test]
    fn test_bypasses_ineligible() {
        let html = concat!(
            r#"<img>"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<img src="relative.png">"#,
            r#"<img src="http://proxy/proxy?url=x">"#,
            r#"<a href="http://a.com/">a</a>"#,
        );
        let (changed, _) = run(&canonical(), html);
        assert!(!changed);
    }

    #[test]
    fn test_relative_resolved_with_base() {
        let (changed, body) = run(&gadget_ctx(), r#"<img src="x.png">"#);
        assert!(changed);
        assert!(body.contains("url=http%3A%2F%2Fg.com%2Fdir%2Fx.png"));
    }

    #[test]
    fn test_respects_url_policy() {
        let ctx = ctx_with(FeatureDefaults {
            exclude_urls: vec!["skip.com".into()],
            ..FeatureDefaults::default()
        });
        let (_, body) = run(
            &ctx,
            r#"<img src="http://skip.com/a.png"><img src="http://ok.com/b.png">"#,
        );
        assert!(body.contains(r#"<img src="http://skip.com/a.png">"#));
        assert!(body.contains("url=http%3A%2F%2Fok.com%2Fb.png"));
    }

    #[test]
    fn test_respects_tag_policy() {
        let ctx = ctx_with(FeatureDefaults {
            include_tags: vec!["script".into()],
            ..FeatureDefaults::default()
        });
        let (changed, _) = run(&ctx, r#"<img src="http://a.com/a.png">"#);
        assert!(!changed);
    }

    #[test]
    fn test_single_batch_and_declines() {
        let manager = Arc::new(Alternating {
            batches: Mutex::new(Vec::new()),
        });
        let walker = DomWalker::new(vec![Arc::new(ProxyingVisitor::new(manager.clone()))]);
        let mut content = content(
            r#"<img src="http://a.com/1.png"><img src="http://a.com/2.png"><img src="http://a.com/3.png">"#,
        );
        walker.rewrite(&canonical(), &mut content).unwrap();

        assert_eq!(*manager.batches.lock(), vec![3]);
        assert_eq!(
            body_html(&mut content),
            r#"<img src="http://p/1.png"><img src="http://a.com/2.png"><img src="http://p/3.png">"#
        );
    }
}
