//! Gadget content rewriting.
//!
//! Rewrites untrusted gadget markup for a container: absolutizes links,
//! routes resources through a proxy, concatenates scripts and stylesheets,
//! strips unsafe markup and caches the results.
//!
//! ```text
//! MutableContent ──► ContentRewriterRegistry ──► Pipeline ──► Rewriter*
//!                     (container, flow)                        │
//!                                                DomWalker ◄───┘
//!                                                   │
//!                                          Visitor* (visit / revisit)
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod dom;
pub mod fetch;
pub mod http;
pub mod logger;
pub mod policy;
pub mod rewrite;
pub mod uri;
pub mod utils;

#[cfg(test)]
mod test_support;
