//! Allow-list sanitizer.
//!
//! | Node                         | Action                                  |
//! |------------------------------|-----------------------------------------|
//! | comment                      | removed                                 |
//! | `html` / `head` / `body`     | kept, attributes filtered               |
//! | element not in tag list      | removed with its content                |
//! | attribute not in list        | removed                                 |
//! | URL attribute, bad scheme    | removed                                 |
//! | `style` attribute / element  | `expression(` dropped, bad `url()` → `none` |
//!
//! Subtrees whose root carries the sanitize-bypass marker are left alone.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Document, NodeData, NodeId};
use crate::policy::SanitizePolicy;
use crate::rewrite::css::references;
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};
use crate::utils::html::is_structural_element;

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]*):").unwrap());

/// Explicit scheme of a URL value, lowercase. Whitespace and control
/// characters are ignored since browsers skip them too.
fn scheme_of(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    SCHEME
        .captures(&cleaned)
        .map(|caps| caps[1].to_ascii_lowercase())
}

/// Relative and protocol-relative values have no scheme and pass.
fn allowed_url(policy: &SanitizePolicy, value: &str) -> bool {
    scheme_of(value).is_none_or(|scheme| policy.is_allowed_scheme(&scheme))
}

/// Outcome of scrubbing a piece of CSS.
#[derive(Debug, PartialEq, Eq)]
enum Scrub {
    Clean,
    Rewritten(String),
    /// Contains script; drop it entirely.
    Dangerous,
}

fn scrub_css(policy: &SanitizePolicy, css: &str) -> Scrub {
    let squashed: String = css
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\\')
        .flat_map(char::to_lowercase)
        .collect();
    if squashed.contains("expression(") {
        return Scrub::Dangerous;
    }

    let mut out: Cow<'_, str> = Cow::Borrowed(css);
    // Back to front so earlier ranges stay valid
    for reference in references(css).iter().rev() {
        if !allowed_url(policy, &reference.value) {
            out.to_mut().replace_range(reference.range.clone(), "none");
        }
    }
    match out {
        Cow::Borrowed(_) => Scrub::Clean,
        Cow::Owned(css) => Scrub::Rewritten(css),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizingVisitor;

impl SanitizingVisitor {
    pub fn new() -> Self {
        Self
    }

    fn bypassed(doc: &Document, node: NodeId) -> bool {
        doc.is_sanitize_bypass(node) || doc.ancestors(node).any(|a| doc.is_sanitize_bypass(a))
    }

    fn filter_attributes(
        policy: &SanitizePolicy,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<bool, RewriteError> {
        let removed = doc.retain_attrs(node, |attr| {
            policy.is_allowed_attribute(&attr.name)
                && (!SanitizePolicy::is_url_attribute(&attr.name) || allowed_url(policy, &attr.value))
        })?;
        let mut changed = removed > 0;

        match doc.attr(node, "style").map(|css| scrub_css(policy, css)) {
            None | Some(Scrub::Clean) => {}
            Some(Scrub::Rewritten(css)) => {
                doc.set_attr(node, "style", css)?;
                changed = true;
            }
            Some(Scrub::Dangerous) => {
                doc.remove_attr(node, "style")?;
                changed = true;
            }
        }
        Ok(changed)
    }
}

impl Visitor for SanitizingVisitor {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        if !ctx.sanitize || Self::bypassed(doc, node) {
            return Ok(VisitStatus::Bypass);
        }
        let policy = ctx.feature.sanitize();

        if matches!(doc.data(node), Some(NodeData::Comment(_))) {
            doc.detach(node)?;
            return Ok(VisitStatus::Modify);
        }
        let Some(tag) = doc.tag_name(node).map(str::to_owned) else {
            return Ok(VisitStatus::Bypass);
        };

        if !is_structural_element(&tag) && !policy.is_allowed_tag(&tag) {
            crate::debug!("sanitize"; "removing <{}>", tag);
            doc.detach(node)?;
            return Ok(VisitStatus::Modify);
        }

        let mut changed = Self::filter_attributes(policy, doc, node)?;
        if tag == "style" {
            match scrub_css(policy, &doc.text_content(node)) {
                Scrub::Clean => {}
                Scrub::Rewritten(css) => {
                    doc.set_text(node, css)?;
                    changed = true;
                }
                Scrub::Dangerous => {
                    doc.set_text(node, "")?;
                    changed = true;
                }
            }
        }

        Ok(if changed {
            VisitStatus::Modify
        } else {
            VisitStatus::Bypass
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::serialize;
    use crate::rewrite::{DomWalker, Rewriter};
    use crate::policy::FeatureDefaults;
    use crate::test_support::{body_html, canonical, content, ctx_with};
    use std::sync::Arc;

    fn walker() -> DomWalker {
        DomWalker::new(vec![Arc::new(SanitizingVisitor::new())])
    }

    fn sanitize(html: &str) -> String {
        let mut content = content(html);
        walker()
            .rewrite(&canonical().with_sanitize(true), &mut content)
            .unwrap();
        body_html(&mut content)
    }

    #[test]
    fn test_removes_disallowed_nodes() {
        let mut content = content(
            r#"<p onclick="steal()">text</p><script>alert(1)</script><!-- note --><iframe src="http://a.com/"></iframe>"#,
        );
        let changed = walker()
            .rewrite(&canonical().with_sanitize(true), &mut content)
            .unwrap();
        assert!(changed);
        assert_eq!(
            content.content(),
            "<html><head></head><body><p>text</p></body></html>"
        );
    }

    #[test]
    fn test_url_schemes() {
        let body = sanitize(concat!(
            r#"<a href="javascript:alert(1)">x</a>"#,
            "<a href=\" JaVa\tscript:x\">y</a>",
            r#"<a href="//cdn.com/a">z</a>"#,
            r#"<a href="rel/path">w</a>"#,
            r#"<img src="https://a.com/i.png" alt="i">"#,
        ));
        assert_eq!(
            body,
            concat!(
                "<a>x</a><a>y</a>",
                r#"<a href="//cdn.com/a">z</a><a href="rel/path">w</a>"#,
                r#"<img src="https://a.com/i.png" alt="i">"#,
            )
        );
    }

    #[test]
    fn test_style_scrubbing() {
        let body = sanitize(concat!(
            r#"<p style="width: expression(alert(1))">a</p>"#,
            r#"<p style="background: url(javascript:x); color: red">b</p>"#,
            "<style>p { background: url(http://a.com/x.png) } q { b: url('vbscript:y') }</style>",
        ));
        assert_eq!(
            body,
            concat!(
                "<p>a</p>",
                r#"<p style="background: none; color: red">b</p>"#,
                "<style>p { background: url(http://a.com/x.png) } q { b: none }</style>",
            )
        );
    }

    #[test]
    fn test_nested_css_references() {
        let body = sanitize(concat!(
            "<p>x</p>",
            r#"<style>@import "javascript:url(vbscript:x)"; a { b: url("@import 'c'") }</style>"#,
        ));
        assert_eq!(body, r#"<p>x</p><style>none; a { b: url("@import 'c'") }</style>"#);
    }

    #[test]
    fn test_script_scheme_on_image() {
        assert_eq!(sanitize(r#"<img src="javascript:evil()" alt="a">"#), r#"<img alt="a">"#);
    }

    #[test]
    fn test_custom_allow_list() {
        let ctx = ctx_with(FeatureDefaults {
            sanitize: Arc::new(SanitizePolicy::new(["p"], Vec::<&str>::new(), ["http", "https"])),
            ..FeatureDefaults::default()
        })
        .with_sanitize(true);
        let mut content = content("<p><script>evil()</script>text</p>");
        assert!(walker().rewrite(&ctx, &mut content).unwrap());
        assert_eq!(body_html(&mut content), "<p>text</p>");
    }

    #[test]
    fn test_requires_flag() {
        let mut content = content("<script>x()</script><p>y</p>");
        assert!(!walker().rewrite(&canonical(), &mut content).unwrap());
    }

    #[test]
    fn test_bypass_subtree() {
        let mut content = content(r#"<div id="keep"><script>ok()</script></div><script>bad()</script>"#);
        {
            let doc = content.document_mut().unwrap();
            let div = doc.find_first("div").unwrap();
            doc.mark_sanitize_bypass(div).unwrap();
        }
        walker()
            .rewrite(&canonical().with_sanitize(true), &mut content)
            .unwrap();
        assert_eq!(
            body_html(&mut content),
            r#"<div id="keep"><script>ok()</script></div>"#
        );
    }

    #[test]
    fn test_clone_does_not_inherit_bypass() {
        let mut content = content("<div><b>x</b></div>");
        let doc = content.document_mut().unwrap();
        let div = doc.find_first("div").unwrap();
        doc.mark_sanitize_bypass(div).unwrap();
        let copy = doc.clone_node(div, true).unwrap();
        assert!(!doc.is_sanitize_bypass(copy));
        doc.copy_sanitize_bypass(div, copy).unwrap();
        assert!(doc.is_sanitize_bypass(copy));
    }

    #[test]
    fn test_structural_kept_when_not_listed() {
        let html = "<html><head><title>t</title></head><body><p>x</p></body></html>";
        let mut content = content(html);
        walker()
            .rewrite(&canonical().with_sanitize(true), &mut content)
            .unwrap();
        assert_eq!(serialize(content.document().unwrap()), html);
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("HTTP://a").as_deref(), Some("http"));
        assert_eq!(scheme_of("\u{1}java\nscript:x").as_deref(), Some("javascript"));
        assert_eq!(scheme_of("//a.com/x"), None);
        assert_eq!(scheme_of("a/b:c"), None);
    }
}
