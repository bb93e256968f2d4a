//! Proxy references inside `<style>` elements.

use std::sync::Arc;

use crate::dom::{Document, NodeId};
use crate::rewrite::css::{proxy_stylesheets, references};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};
use crate::uri::ProxyUriManager;

pub struct CssUrlVisitor {
    manager: Arc<dyn ProxyUriManager>,
}

impl CssUrlVisitor {
    pub fn new(manager: Arc<dyn ProxyUriManager>) -> Self {
        Self { manager }
    }
}

impl Visitor for CssUrlVisitor {
    fn name(&self) -> &'static str {
        "css-url"
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        if !doc.is_element(node, "style") || !ctx.feature.should_rewrite_tag("style") {
            return Ok(VisitStatus::Bypass);
        }
        if references(&doc.text_content(node)).is_empty() {
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
        let sheets: Vec<String> = nodes.iter().map(|&n| doc.text_content(n)).collect();
        let views: Vec<&str> = sheets.iter().map(String::as_str).collect();
        let rewritten = proxy_stylesheets(ctx, self.manager.as_ref(), &views, Some("style"));

        let mut changed = false;
        for (&node, css) in nodes.iter().zip(rewritten) {
            if let Some(css) = css {
                doc.set_text(node, css)?;
                changed = true;
            }
        }
        Ok(changed)
    }
}
