//! Pipeline lookup by container and flow.
//!
//! Lookups fall back to [`DEFAULT_CONTAINER`] for the same flow and never
//! across flows:
//!
//! ```text
//! (acme, Sanitize) → (acme, Sanitize)?  → (default, Sanitize)?  → NoPipeline
//! ```
//!
//! The table is swapped whole on registration, so concurrent readers never
//! block and always see a complete table.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::ValueEnum;
use rustc_hash::FxHashMap;

use super::{Pipeline, RewriteContext, RewriteError};
use crate::content::MutableContent;

/// Container whose pipelines serve containers without their own.
pub const DEFAULT_CONTAINER: &str = "default";

/// Kind of content being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Flow {
    /// Gadget HTML rendered for a container.
    Default,
    /// Proxied third-party HTML (page acceleration).
    Accelerate,
    /// Untrusted HTML shown inline.
    Sanitize,
    /// Image responses.
    Image,
    /// Stylesheet responses.
    Css,
}

impl Flow {
    pub const ALL: [Flow; 5] = [
        Flow::Default,
        Flow::Accelerate,
        Flow::Sanitize,
        Flow::Image,
        Flow::Css,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Accelerate => "accelerate",
            Self::Sanitize => "sanitize",
            Self::Image => "image",
            Self::Css => "css",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flow| flow.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown flow `{s}`"))
    }
}

/// Runs the pipeline registered for a container and flow.
pub trait ContentRewriterRegistry: Send + Sync {
    fn rewrite(
        &self,
        ctx: &RewriteContext,
        container: &str,
        flow: Flow,
        content: &mut MutableContent,
    ) -> Result<bool, RewriteError>;
}

type Table = FxHashMap<(String, Flow), Arc<Pipeline>>;

#[derive(Default)]
pub struct RewriterRegistry {
    pipelines: ArcSwap<Table>,
}

impl RewriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the pipeline for `(container, flow)`.
    pub fn register(&self, container: impl Into<String>, flow: Flow, pipeline: Pipeline) {
        let key = (container.into(), flow);
        let pipeline = Arc::new(pipeline);
        self.pipelines.rcu(|current| {
            let mut next = Table::clone(current);
            next.insert(key.clone(), Arc::clone(&pipeline));
            next
        });
        crate::debug!("rewrite"; "registered {} for {}/{}", pipeline.fingerprint(), key.0, key.1);
    }

    /// Pipeline for `(container, flow)`, falling back to the default
    /// container for the same flow.
    pub fn lookup(&self, container: &str, flow: Flow) -> Result<Arc<Pipeline>, RewriteError> {
        let table = self.pipelines.load();
        table
            .get(&(container.to_owned(), flow))
            .or_else(|| table.get(&(DEFAULT_CONTAINER.to_owned(), flow)))
            .cloned()
            .ok_or_else(|| RewriteError::NoPipeline {
                container: container.to_owned(),
                flow,
            })
    }

    /// Registered `(container, flow)` pairs, sorted.
    pub fn entries(&self) -> Vec<(String, Flow, Arc<Pipeline>)> {
        let mut entries: Vec<_> = self
            .pipelines
            .load()
            .iter()
            .map(|((container, flow), pipeline)| (container.clone(), *flow, Arc::clone(pipeline)))
            .collect();
        entries.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        entries
    }
}

impl ContentRewriterRegistry for RewriterRegistry {
    fn rewrite(
        &self,
        ctx: &RewriteContext,
        container: &str,
        flow: Flow,
        content: &mut MutableContent,
    ) -> Result<bool, RewriteError> {
        let pipeline = self.lookup(container, flow)?;
        pipeline.run(ctx, content)
    }
}
