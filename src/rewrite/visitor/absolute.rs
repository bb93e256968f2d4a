//! Resolve relative references against the gadget URL.

use crate::dom::{Document, NodeId};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};

use super::{hyperlink_attr, resource_attr};

/// Which references to absolutize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagGroup {
    /// Resource loads (`img src`, `link href`, `script src`, ...).
    Resources,
    /// Navigation targets (`a href`, `area href`, `form action`).
    Hyperlinks,
    All,
}

#[derive(Debug, Clone, Copy)]
pub struct AbsolutePathVisitor {
    group: TagGroup,
}

impl AbsolutePathVisitor {
    pub fn new(group: TagGroup) -> Self {
        Self { group }
    }

    fn target_attr(&self, doc: &Document, node: NodeId) -> Option<&'static str> {
        match self.group {
            TagGroup::Resources => resource_attr(doc, node),
            TagGroup::Hyperlinks => hyperlink_attr(doc, node),
            TagGroup::All => resource_attr(doc, node).or_else(|| hyperlink_attr(doc, node)),
        }
    }
}

impl Default for AbsolutePathVisitor {
    fn default() -> Self {
        Self::new(TagGroup::All)
    }
}

impl Visitor for AbsolutePathVisitor {
    fn name(&self) -> &'static str {
        match self.group {
            TagGroup::Resources => "absolute-resources",
            TagGroup::Hyperlinks => "absolute-links",
            TagGroup::All => "absolute",
        }
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        let Some(base) = ctx.base_url() else {
            return Ok(VisitStatus::Bypass);
        };
        let Some(attr) = self.target_attr(doc, node) else {
            return Ok(VisitStatus::Bypass);
        };
        let Some(value) = doc.attr(node, attr) else {
            return Ok(VisitStatus::Bypass);
        };

        let reference = value.trim();
        // Fragment-only and empty references stay relative to the host page
        if reference.is_empty() || reference.starts_with('#') {
            return Ok(VisitStatus::Bypass);
        }
        let Ok(resolved) = base.join(reference) else {
            return Ok(VisitStatus::Bypass);
        };
        if resolved.as_str() == value {
            return Ok(VisitStatus::Bypass);
        }

        doc.set_attr(node, attr, resolved.as_str())?;
        Ok(VisitStatus::Modify)
    }
}
