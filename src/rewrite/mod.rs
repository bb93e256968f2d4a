//! Content rewriting engine.
//!
//! # Module Structure
//!
//! ```text
//! rewrite/
//! ├── context      # RewriteContext (per-request settings)
//! ├── error        # RewriteError
//! ├── walker       # Visitor contract + DomWalker driver
//! ├── visitor/     # Concrete visitors
//! ├── css          # url()/@import scanning + CssResponseRewriter
//! ├── registry     # (container, flow) → Pipeline
//! ├── caching      # Result-caching registry wrapper
//! └── pipelines    # Stock pipeline assembly
//! ```
//!
//! # Flow
//!
//! ```text
//! registry.rewrite(ctx, container, flow, content)
//!     │
//!     ▼
//! Pipeline ── Rewriter 1 (DomWalker[v1, v2]) ─┐
//!          ── Rewriter 2 (DomWalker[v3])     ├─► MutableContent
//!          ── Rewriter 3 (CssResponseRewriter)┘
//! ```
//!
//! Rewriters run in order over one shared [`MutableContent`]; the first
//! error aborts the rest of the pipeline.

mod caching;
mod context;
pub mod css;
mod error;
pub mod pipelines;
mod registry;
pub mod visitor;
mod walker;

#[cfg(test)]
mod tests;

pub use caching::{CachedRewrite, CachingRewriterRegistry};
pub use context::RewriteContext;
pub use css::CssResponseRewriter;
pub use error::RewriteError;
pub use registry::{ContentRewriterRegistry, DEFAULT_CONTAINER, Flow, RewriterRegistry};
pub use walker::{DomWalker, VisitStatus, Visitor};

use std::sync::Arc;

use crate::content::MutableContent;

// =============================================================================
// Rewriter
// =============================================================================

/// One stage of a pipeline.
pub trait Rewriter: Send + Sync {
    /// Stable identity; part of the pipeline fingerprint.
    fn id(&self) -> String;

    /// Rewrite in place. Returns whether anything changed.
    fn rewrite(&self, ctx: &RewriteContext, content: &mut MutableContent)
    -> Result<bool, RewriteError>;
}

// =============================================================================
// Pipeline
// =============================================================================

/// Immutable, ordered list of rewriters.
pub struct Pipeline {
    name: String,
    rewriters: Vec<Arc<dyn Rewriter>>,
    fingerprint: String,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>, rewriters: Vec<Arc<dyn Rewriter>>) -> Self {
        let fingerprint = rewriters
            .iter()
            .map(|r| r.id())
            .collect::<Vec<_>>()
            .join("|");
        Self {
            name: name.into(),
            rewriters,
            fingerprint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered rewriter ids. Any composition change yields a new value.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }

    pub fn rewriter_ids(&self) -> Vec<String> {
        self.rewriters.iter().map(|r| r.id()).collect()
    }

    /// Run every rewriter in order.
    pub fn run(&self, ctx: &RewriteContext, content: &mut MutableContent) -> Result<bool, RewriteError> {
        let mut changed = false;
        for rewriter in &self.rewriters {
            if rewriter.rewrite(ctx, content)? {
                crate::debug!("rewrite"; "{} changed content", rewriter.id());
                changed = true;
            }
        }
        Ok(changed)
    }
}
