//! HTML parsing into the mutable [`Document`] arena.
//!
//! The tree builder is html5ever: it repairs malformed markup the way browsers
//! do, so the document the visitors see matches what a host page would render.
//! The resulting `RcDom` is copied into the arena once and dropped.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use thiserror::Error;

use super::{Attribute, Document, ElementData, NodeId};

/// Default upper bound for parsed input (8 MiB).
pub const DEFAULT_MAX_INPUT_LEN: usize = 8 * 1024 * 1024;

/// Reasons a document cannot be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("content of {len} bytes exceeds the {limit} byte parse limit")]
    TooLarge { len: usize, limit: usize },

    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Turns a content string into a document tree.
pub trait HtmlParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Document, ParseError>;
}

/// html5ever-backed parser producing full documents (`html`/`head`/`body`).
#[derive(Debug, Clone)]
pub struct Html5everParser {
    max_input_len: usize,
}

impl Default for Html5everParser {
    fn default() -> Self {
        Self {
            max_input_len: DEFAULT_MAX_INPUT_LEN,
        }
    }
}

impl Html5everParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest input accepted, in bytes.
    pub fn with_max_input_len(mut self, max_input_len: usize) -> Self {
        self.max_input_len = max_input_len;
        self
    }
}

impl HtmlParser for Html5everParser {
    fn parse(&self, source: &str) -> Result<Document, ParseError> {
        if source.len() > self.max_input_len {
            return Err(ParseError::TooLarge {
                len: source.len(),
                limit: self.max_input_len,
            });
        }

        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(source);
        if !dom.errors.is_empty() {
            crate::debug!("parse"; "recovered from {} markup errors", dom.errors.len());
        }

        let mut doc = Document::new();
        let root = doc.root();
        copy_children(&dom.document, root, &mut doc);
        Ok(doc)
    }
}

/// Copy an rcdom subtree into the arena without recursion, so deeply nested
/// hostile markup cannot exhaust the stack.
fn copy_children(source: &Handle, target: NodeId, doc: &mut Document) {
    let mut stack: Vec<(Handle, NodeId)> = children_of(source)
        .into_iter()
        .rev()
        .map(|child| (child, target))
        .collect();

    while let Some((handle, parent)) = stack.pop() {
        let Some(node) = convert(&handle, doc) else {
            continue;
        };
        // Parent ids come from this fresh document, so insertion cannot fail
        if doc.append_child(parent, node).is_err() {
            continue;
        }
        for child in children_of(&handle).into_iter().rev() {
            stack.push((child, node));
        }
    }
}

/// Children of an rcdom node; `<template>` contents are inlined as children.
fn children_of(handle: &Handle) -> Vec<Handle> {
    let mut children = handle.children.borrow().clone();
    if let RcNodeData::Element {
        template_contents, ..
    } = &handle.data
        && let Some(contents) = template_contents.borrow().as_ref()
    {
        children.extend(contents.children.borrow().iter().cloned());
    }
    children
}

fn convert(handle: &Handle, doc: &mut Document) -> Option<NodeId> {
    let id = match &handle.data {
        RcNodeData::Doctype { name, .. } => doc.create_doctype(name.to_string()),
        RcNodeData::Text { contents } => doc.create_text(contents.borrow().to_string()),
        RcNodeData::Comment { contents } => doc.create_comment(contents.to_string()),
        RcNodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| Attribute {
                    name: match &attr.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                        None => attr.name.local.to_string(),
                    },
                    value: attr.value.to_string(),
                })
                .collect();
            doc.create_element_data(ElementData {
                name: name.local.to_string(),
                attrs,
            })
        }
        RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => return None,
    };
    Some(id)
}

// =============================================================================
// Tests
// =============================================================================
