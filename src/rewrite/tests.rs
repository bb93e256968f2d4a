//! End-to-end runs of the stock pipelines.

use std::sync::Arc;
use std::time::Duration;

use super::pipelines::{Services, register_standard};
use super::*;
use crate::cache::MemoryCache;
use crate::content::MutableContent;
use crate::test_support::{
    StubFetcher, body_html, canonical, content, gadget_ctx, head_html, oversized_content,
    services, services_with,
};

fn registry(services: &Services) -> RewriterRegistry {
    let registry = RewriterRegistry::new();
    register_standard(&registry, DEFAULT_CONTAINER, services);
    registry
}

fn run(ctx: &RewriteContext, flow: Flow, content: &mut MutableContent) -> bool {
    registry(&services())
        .rewrite(ctx, "acme", flow, content)
        .unwrap()
}

#[test]
fn test_adjacent_scripts_become_one_concat() {
    let mut content = content(concat!(
        r#"<script src="http://a.com/1.js"></script>"#,
        r#"<script src="http://a.com/2.js"></script>"#,
        "<p>x</p>",
    ));
    assert!(run(&canonical(), Flow::Default, &mut content));

    let doc = content.document().unwrap();
    let scripts = doc.find_all("script");
    assert_eq!(scripts.len(), 1);
    let src = doc.attr(scripts[0], "src").unwrap();
    assert!(src.starts_with("http://proxy/concat?"));
    assert!(src.ends_with("&type=js&1=http%3A%2F%2Fa.com%2F1.js&2=http%3A%2F%2Fa.com%2F2.js"));
}

#[test]
fn test_relative_resource_absolutized_then_proxied() {
    let mut content = content(r#"<img src="img/a.png"><a href="next.html">n</a>"#);
    assert!(run(&gadget_ctx(), Flow::Default, &mut content));
    assert_eq!(
        body_html(&mut content),
        concat!(
            r#"<img src="http://proxy/proxy?container=default&amp;gadget=http%3A%2F%2Fg.com%2Fdir%2Fgadget.xml"#,
            r#"&amp;debug=0&amp;nocache=0&amp;url=http%3A%2F%2Fg.com%2Fdir%2Fimg%2Fa.png">"#,
            r#"<a href="http://g.com/dir/next.html">n</a>"#,
        )
    );
}

#[test]
fn test_styles_moved_and_proxied() {
    let mut content = content("<p>x</p><style>p { background: url(http://a.com/bg.png) }</style>");
    assert!(run(&canonical(), Flow::Default, &mut content));
    let head = head_html(&mut content);
    assert!(head.starts_with("<style>p { background: url(\"http://proxy/proxy?"));
    assert!(head.contains("url=http%3A%2F%2Fa.com%2Fbg.png"));
    assert_eq!(body_html(&mut content), "<p>x</p>");
}

#[test]
fn test_sanitize_flow() {
    let mut content = content(concat!(
        r#"<p onmouseover="x()">hi</p><script>evil()</script>"#,
        r#"<a href="javascript:evil()">a</a><img src="http://a.com/i.png">"#,
    ));
    let ctx = canonical().with_sanitize(true);
    assert!(run(&ctx, Flow::Sanitize, &mut content));
    assert_eq!(
        body_html(&mut content),
        concat!(
            "<p>hi</p><a>a</a>",
            r#"<img src="http://proxy/proxy?container=default&amp;debug=0&amp;nocache=0&amp;url=http%3A%2F%2Fa.com%2Fi.png">"#,
        )
    );
}

#[test]
fn test_default_flow_without_sanitize_keeps_scripts() {
    let mut content = content("<p>hi</p><script>inline()</script>");
    run(&canonical(), Flow::Default, &mut content);
    assert_eq!(body_html(&mut content), "<p>hi</p><script>inline()</script>");
}

#[test]
fn test_accelerate_warms_response_cache() {
    let services = services_with(StubFetcher::new().with("http://a.com/i.png", 200, "img"));
    let registry = registry(&services);
    let mut content = content(r#"<img src="http://a.com/i.png">"#);
    registry
        .rewrite(&canonical(), "acme", Flow::Accelerate, &mut content)
        .unwrap();
    services.pool.wait_idle();

    let cached = services.responses.get("http://a.com/i.png").unwrap().unwrap();
    assert_eq!(cached.body, b"img");
    assert!(body_html(&mut content).contains("url=http%3A%2F%2Fa.com%2Fi.png"));
}

#[test]
fn test_css_flow_works_on_text() {
    let mut content = content("@import 'http://a.com/base.css';");
    assert!(run(&canonical(), Flow::Css, &mut content));
    assert!(!content.has_document());
    assert!(content.content().starts_with("@import \"http://proxy/proxy?"));
}

#[test]
fn test_parse_failure_aborts() {
    let mut content = oversized_content();
    let err = registry(&services())
        .rewrite(&canonical(), "acme", Flow::Default, &mut content)
        .unwrap_err();
    assert!(matches!(err, RewriteError::Parse(_)));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_cached_registry_end_to_end() {
    let services = services();
    let inner = Arc::new(registry(&services));
    let cached = CachingRewriterRegistry::new(
        Arc::clone(&inner),
        Arc::new(MemoryCache::new(16)),
        Duration::ZERO,
        Duration::from_secs(60),
    );
    let html = r#"<img src="http://a.com/i.png">"#;

    let mut first = content(html);
    cached
        .rewrite(&canonical(), "acme", Flow::Default, &mut first)
        .unwrap();
    let mut second = content(html);
    assert!(cached
        .rewrite(&canonical(), "acme", Flow::Default, &mut second)
        .unwrap());
    assert_eq!(first.into_content(), second.content());
    assert!(!second.has_document());

    // Swapping the composition must not serve the old result
    inner.register(
        DEFAULT_CONTAINER,
        Flow::Default,
        Pipeline::new("plain", Vec::new()),
    );
    let mut third = content(html);
    assert!(!cached
        .rewrite(&canonical(), "acme", Flow::Default, &mut third)
        .unwrap());
    assert_eq!(third.content(), html);
}
