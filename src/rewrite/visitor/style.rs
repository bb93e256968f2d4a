//! Move styles into `<head>`.

use super::is_stylesheet_link;
use crate::dom::{Document, NodeId};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};

/// Claims every `<style>` and stylesheet `<link>` and appends them to
/// `<head>` in document order, creating the head when missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleAdjacencyVisitor;

impl StyleAdjacencyVisitor {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_head(doc: &mut Document) -> Result<Option<NodeId>, RewriteError> {
    if let Some(head) = doc.head() {
        return Ok(Some(head));
    }
    let Some(html) = doc.document_element() else {
        return Ok(None);
    };
    let head = doc.create_element("head");
    doc.prepend_child(html, head)?;
    Ok(Some(head))
}

impl Visitor for StyleAdjacencyVisitor {
    fn name(&self) -> &'static str {
        "style"
    }

    fn visit(
        &self,
        _ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        if doc.is_element(node, "style") || is_stylesheet_link(doc, node) {
            Ok(VisitStatus::ReserveTree)
        } else {
            Ok(VisitStatus::Bypass)
        }
    }

    fn revisit(
        &self,
        _ctx: &RewriteContext,
        doc: &mut Document,
        nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        if nodes.is_empty() {
            return Ok(false);
        }
        let had_head = doc.head().is_some();
        let Some(head) = ensure_head(doc)? else {
            return Ok(false);
        };
        // Already the trailing children of <head>, in order
        if had_head && doc.children(head).ends_with(nodes) {
            return Ok(false);
        }
        for &node in nodes {
            doc.append_child(head, node)?;
        }
        Ok(true)
    }
}
