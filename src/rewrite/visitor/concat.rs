//! Merge adjacent external scripts or stylesheets into concat requests.

use std::sync::Arc;

use url::Url;

use super::is_stylesheet_link;
use crate::dom::{Document, NodeData, NodeId};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};
use crate::uri::{ConcatBatch, ConcatType, ConcatUriManager};
use crate::utils::html::{escape_js_string, is_html_whitespace};

const JS_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "application/x-javascript",
    "text/ecmascript",
    "application/ecmascript",
];

/// One concat candidate.
struct Resource {
    node: NodeId,
    url: Url,
    media: String,
}

/// Reserves concatenable `<script src>` or `<link rel=stylesheet>` nodes and
/// rewrites each run of adjacent ones into a single request.
pub struct ConcatVisitor {
    kind: ConcatType,
    manager: Arc<dyn ConcatUriManager>,
}

impl ConcatVisitor {
    pub fn js(manager: Arc<dyn ConcatUriManager>) -> Self {
        Self {
            kind: ConcatType::Js,
            manager,
        }
    }

    pub fn css(manager: Arc<dyn ConcatUriManager>) -> Self {
        Self {
            kind: ConcatType::Css,
            manager,
        }
    }

    fn resource(&self, ctx: &RewriteContext, doc: &Document, node: NodeId) -> Option<Resource> {
        let (tag, attr) = match self.kind {
            ConcatType::Js => {
                if !doc.is_element(node, "script") {
                    return None;
                }
                let js_type = doc
                    .attr(node, "type")
                    .map(|t| t.trim().to_ascii_lowercase())
                    .unwrap_or_default();
                if !(js_type.is_empty() || JS_TYPES.contains(&js_type.as_str())) {
                    return None;
                }
                // Inline code alongside src would be lost
                if !is_html_whitespace(&doc.text_content(node)) {
                    return None;
                }
                ("script", "src")
            }
            ConcatType::Css => {
                if !is_stylesheet_link(doc, node) {
                    return None;
                }
                let css_type = doc.attr(node, "type").map(str::trim).unwrap_or_default();
                if !(css_type.is_empty() || css_type.eq_ignore_ascii_case("text/css")) {
                    return None;
                }
                ("link", "href")
            }
        };

        if !ctx.feature.should_rewrite_tag(tag) {
            return None;
        }
        let url = ctx.resolve(doc.attr(node, attr)?)?;
        if !matches!(url.scheme(), "http" | "https")
            || self.manager.is_concat(&url)
            || !ctx.feature.should_rewrite_url(url.as_str())
        {
            return None;
        }

        let media = doc
            .attr(node, "media")
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| m != "all")
            .unwrap_or_default();
        Some(Resource { node, url, media })
    }

    /// Split reserved resources into runs of adjacent nodes.
    fn runs(&self, doc: &Document, resources: Vec<Resource>, single: bool) -> Vec<Vec<Resource>> {
        let mut runs: Vec<Vec<Resource>> = Vec::new();
        for resource in resources {
            if !single
                && let Some(run) = runs.last_mut()
                && let Some(last) = run.last()
                && last.media == resource.media
                && adjacent(doc, last.node, resource.node)
            {
                run.push(resource);
                continue;
            }
            runs.push(vec![resource]);
        }
        runs
    }

    /// Replace one segment of a run with the concat element.
    fn replace(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        segment: &[Resource],
        uri: &Url,
    ) -> Result<(), RewriteError> {
        let Some(first) = segment.first() else {
            return Ok(());
        };

        let element = match self.kind {
            ConcatType::Js => doc.create_element_with("script", &[("src", uri.as_str())]),
            ConcatType::Css => {
                let mut attrs = vec![
                    ("rel", "stylesheet"),
                    ("type", "text/css"),
                    ("href", uri.as_str()),
                ];
                if !first.media.is_empty() {
                    attrs.push(("media", first.media.as_str()));
                }
                doc.create_element_with("link", &attrs)
            }
        };
        doc.insert_before(first.node, element)?;

        let split = self.kind == ConcatType::Js && ctx.feature.concat().split_js;
        for resource in segment {
            if split {
                let eval = doc.create_element("script");
                let code = doc.create_text(format!(
                    "eval(_js['{}']);",
                    escape_js_string(resource.url.as_str())
                ));
                doc.append_child(eval, code)?;
                doc.replace(resource.node, eval)?;
            } else {
                doc.detach(resource.node)?;
            }
        }
        Ok(())
    }
}

/// Whether `next` follows `prev` with only ignorable nodes in between.
/// Whitespace text and ordinary comments are ignorable; conditional comments
/// are not, since they change what the browser loads.
fn adjacent(doc: &Document, prev: NodeId, next: NodeId) -> bool {
    let mut cursor = doc.next_sibling(prev);
    while let Some(node) = cursor {
        if node == next {
            return true;
        }
        let ignorable = match doc.data(node) {
            Some(NodeData::Text(text)) => is_html_whitespace(text),
            Some(NodeData::Comment(comment)) => !is_conditional_comment(comment),
            _ => false,
        };
        if !ignorable {
            return false;
        }
        cursor = doc.next_sibling(node);
    }
    false
}

/// `[if IE]>...`, `[endif]` and `<![endif]` markers.
pub(crate) fn is_conditional_comment(comment: &str) -> bool {
    let comment = comment.trim_start();
    comment.starts_with("[if") || comment.starts_with("[endif]") || comment.starts_with("<![endif]")
}

impl Visitor for ConcatVisitor {
    fn name(&self) -> &'static str {
        match self.kind {
            ConcatType::Js => "concat-js",
            ConcatType::Css => "concat-css",
        }
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        if !ctx.feature.concat().enable || self.resource(ctx, doc, node).is_none() {
            return Ok(VisitStatus::Bypass);
        }
        Ok(VisitStatus::ReserveNode)
    }

    fn revisit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        let resources: Vec<Resource> = nodes
            .iter()
            .filter_map(|&node| self.resource(ctx, doc, node))
            .collect();
        let runs = self.runs(doc, resources, ctx.feature.concat().single_resource);
        if runs.is_empty() {
            return Ok(false);
        }

        let batches: Vec<ConcatBatch> = runs
            .iter()
            .map(|run| ConcatBatch {
                kind: self.kind,
                urls: run.iter().map(|r| r.url.clone()).collect(),
            })
            .collect();
        let built = self.manager.batch_build_concat_uris(ctx, &batches);

        let mut changed = false;
        for (run, data) in runs.iter().zip(built) {
            let Some(data) = data else {
                continue;
            };
            let mut offset = 0;
            for segment in &data.segments {
                let end = (offset + segment.len).min(run.len());
                if let Some(uri) = &segment.uri {
                    self.replace(ctx, doc, &run[offset..end], uri)?;
                    changed = true;
                }
                offset = end;
            }
        }
        Ok(changed)
    }
}
