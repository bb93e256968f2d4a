//! Stock pipelines.
//!
//! | Flow         | Stages                                                      |
//! |--------------|-------------------------------------------------------------|
//! | `default`    | absolutize → style → resources → sanitize                   |
//! | `accelerate` | absolutize → cache-enforce → resources                      |
//! | `sanitize`   | absolutize → sanitize → proxy                               |
//! | `image`      | image-size + proxy                                          |
//! | `css`        | css-response                                                |
//!
//! `resources` is one walk running concat-css, concat-js, css-url and proxy,
//! so concatenated nodes are gone before the proxy batch runs.

use std::sync::Arc;

use super::visitor::{
    AbsolutePathVisitor, CacheEnforcementVisitor, ConcatVisitor, CssUrlVisitor,
    ImageAttributeVisitor, ProxyingVisitor, SanitizingVisitor, StyleAdjacencyVisitor, TagGroup,
};
use super::{CssResponseRewriter, DomWalker, Flow, Pipeline, Rewriter, RewriterRegistry, Visitor};
use crate::cache::Cache;
use crate::fetch::{Fetcher, WorkerPool};
use crate::http::HttpResponse;
use crate::uri::{ConcatUriManager, ProxyUriManager};

/// Collaborators the stock visitors need.
#[derive(Clone)]
pub struct Services {
    pub proxy: Arc<dyn ProxyUriManager>,
    pub concat: Arc<dyn ConcatUriManager>,
    pub responses: Arc<dyn Cache<HttpResponse>>,
    pub fetcher: Arc<dyn Fetcher>,
    pub pool: Arc<WorkerPool>,
}

fn walker(visitors: Vec<Arc<dyn Visitor>>) -> Arc<dyn Rewriter> {
    Arc::new(DomWalker::new(visitors))
}

fn resources(services: &Services) -> Arc<dyn Rewriter> {
    walker(vec![
        Arc::new(ConcatVisitor::css(Arc::clone(&services.concat))),
        Arc::new(ConcatVisitor::js(Arc::clone(&services.concat))),
        Arc::new(CssUrlVisitor::new(Arc::clone(&services.proxy))),
        Arc::new(ProxyingVisitor::new(Arc::clone(&services.proxy))),
    ])
}

/// The stock pipeline for one flow.
pub fn standard(flow: Flow, services: &Services) -> Pipeline {
    let absolutize = || walker(vec![Arc::new(AbsolutePathVisitor::new(TagGroup::All))]);
    let sanitize = || walker(vec![Arc::new(SanitizingVisitor::new())]);

    let rewriters: Vec<Arc<dyn Rewriter>> = match flow {
        Flow::Default => vec![
            absolutize(),
            walker(vec![Arc::new(StyleAdjacencyVisitor::new())]),
            resources(services),
            sanitize(),
        ],
        Flow::Accelerate => vec![
            absolutize(),
            walker(vec![Arc::new(CacheEnforcementVisitor::new(
                Arc::clone(&services.responses),
                Arc::clone(&services.fetcher),
                Arc::clone(&services.pool),
            ))]),
            resources(services),
        ],
        Flow::Sanitize => vec![
            absolutize(),
            sanitize(),
            walker(vec![Arc::new(ProxyingVisitor::new(Arc::clone(&services.proxy)))]),
        ],
        Flow::Image => vec![walker(vec![
            Arc::new(ImageAttributeVisitor::new(
                Arc::clone(&services.fetcher),
                Arc::clone(&services.pool),
            )),
            Arc::new(ProxyingVisitor::new(Arc::clone(&services.proxy))),
        ])],
        Flow::Css => vec![Arc::new(CssResponseRewriter::new(Arc::clone(&services.proxy)))],
    };
    Pipeline::new(flow.as_str(), rewriters)
}

/// Register every stock pipeline for `container`.
pub fn register_standard(registry: &RewriterRegistry, container: &str, services: &Services) {
    for flow in Flow::ALL {
        registry.register(container, flow, standard(flow, services));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::DEFAULT_CONTAINER;
    use crate::test_support::services;

    #[test]
    fn test_fingerprints() {
        let services = services();
        assert_eq!(
            standard(Flow::Default, &services).fingerprint(),
            "dom[absolute]|dom[style]|dom[concat-css,concat-js,css-url,proxy]|dom[sanitize]"
        );
        assert_eq!(
            standard(Flow::Sanitize, &services).fingerprint(),
            "dom[absolute]|dom[sanitize]|dom[proxy]"
        );
        assert_eq!(standard(Flow::Css, &services).fingerprint(), "css-response");
    }

    #[test]
    fn test_register_all_flows() {
        let registry = RewriterRegistry::new();
        register_standard(&registry, DEFAULT_CONTAINER, &services());
        for flow in Flow::ALL {
            assert_eq!(registry.lookup("any", flow).unwrap().name(), flow.as_str());
        }
    }
}
