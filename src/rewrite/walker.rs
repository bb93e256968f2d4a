//! Visitor contract and the DOM walking driver.
//!
//! # Traversal
//!
//! ```text
//! for node in pre-order(document):
//!     for visitor in visitors:           // registration order
//!         Bypass      → next visitor
//!         Modify      → count mutation, next visitor
//!         ReserveNode → reserve for this visitor, next visitor
//!         ReserveTree → reserve for this visitor, stop; skip descendants
//! for visitor in visitors with reservations:
//!     revisit(reserved nodes in document order)
//! ```
//!
//! Children are read after every visitor has seen the parent, so nodes a
//! visitor appends below the current node are traversed; siblings inserted
//! after the current node are not. Nodes detached during the walk are skipped.

use std::sync::Arc;

use super::{RewriteContext, RewriteError, Rewriter};
use crate::content::MutableContent;
use crate::dom::{Document, NodeId};

/// A visitor's decision for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// Not interested.
    Bypass,
    /// Rewritten in place.
    Modify,
    /// Process later in a batch; keep traversing and keep offering the node
    /// to later visitors.
    ReserveNode,
    /// Process later in a batch; claim the node and its subtree exclusively.
    ReserveTree,
}

/// Per-node rewrite strategy. Holds configuration only, never walk state,
/// so one instance can serve concurrent walks.
pub trait Visitor: Send + Sync {
    /// Stable name; part of the walker id.
    fn name(&self) -> &'static str;

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError>;

    /// Batch-process the nodes this visitor reserved, in document order.
    /// Returns whether the document changed.
    fn revisit(
        &self,
        _ctx: &RewriteContext,
        _doc: &mut Document,
        _nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        Ok(false)
    }
}

/// Runs an ordered list of visitors over a document in one pass.
pub struct DomWalker {
    id: String,
    visitors: Vec<Arc<dyn Visitor>>,
}

impl DomWalker {
    pub fn new(visitors: Vec<Arc<dyn Visitor>>) -> Self {
        let names: Vec<&str> = visitors.iter().map(|v| v.name()).collect();
        Self {
            id: format!("dom[{}]", names.join(",")),
            visitors,
        }
    }

    pub fn visitors(&self) -> &[Arc<dyn Visitor>] {
        &self.visitors
    }

    /// Walk the document. Returns the number of counted mutations.
    pub fn walk(&self, ctx: &RewriteContext, doc: &mut Document) -> Result<usize, RewriteError> {
        let mut reserved: Vec<Vec<NodeId>> = vec![Vec::new(); self.visitors.len()];
        let mut mutations = 0usize;
        let mut visited = 0usize;

        let mut stack: Vec<NodeId> = doc.children(doc.root());
        stack.reverse();

        while let Some(node) = stack.pop() {
            if !doc.is_attached(node) {
                continue;
            }
            visited += 1;

            let mut claimed = false;
            for (index, visitor) in self.visitors.iter().enumerate() {
                if !doc.is_attached(node) {
                    break;
                }
                match visitor.visit(ctx, doc, node)? {
                    VisitStatus::Bypass => {}
                    VisitStatus::Modify => mutations += 1,
                    VisitStatus::ReserveNode => reserved[index].push(node),
                    VisitStatus::ReserveTree => {
                        reserved[index].push(node);
                        claimed = true;
                        break;
                    }
                }
            }

            if claimed || !doc.is_attached(node) {
                continue;
            }
            stack.extend(doc.children(node).into_iter().rev());
        }

        for (visitor, nodes) in self.visitors.iter().zip(&reserved) {
            if nodes.is_empty() {
                continue;
            }
            // Earlier revisits may have detached reserved nodes
            let live: Vec<NodeId> = nodes
                .iter()
                .copied()
                .filter(|&n| doc.is_attached(n))
                .collect();
            if live.is_empty() {
                continue;
            }
            if visitor.revisit(ctx, doc, &live)? {
                mutations += 1;
            }
        }

        crate::debug!(
            "rewrite";
            "{}: visited {} nodes, reserved {}, {} mutations",
            self.id,
            visited,
            reserved.iter().map(Vec::len).sum::<usize>(),
            mutations
        );
        Ok(mutations)
    }
}

impl Rewriter for DomWalker {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn rewrite(
        &self,
        ctx: &RewriteContext,
        content: &mut MutableContent,
    ) -> Result<bool, RewriteError> {
        let doc = content.document_mut()?;
        if self.walk(ctx, doc)? > 0 {
            content.document_changed();
            return Ok(true);
        }
        Ok(false)
    }
}

// =============================================================================
// Tests
// =============================================================================
