//! Mutable document tree.
//!
//! An arena of nodes addressed by [`NodeId`] handles. Every handle carries the
//! generation of the document that issued it; mutations through a handle of a
//! different generation fail with [`DomError::StaleNode`], so edits made
//! against a tree that was replaced by a re-parse are never silently lost.
//!
//! Detached nodes stay in the arena until the document is dropped. A document
//! lives for exactly one rewrite, so nothing is reclaimed.
//!
//! # Modules
//!
//! - `parse`: [`HtmlParser`] seam and the html5ever-backed implementation
//! - `serialize`: document → HTML string

mod parse;
mod serialize;

pub use parse::{Html5everParser, HtmlParser, ParseError};
pub use serialize::{serialize, serialize_node};

use thiserror::Error;

// =============================================================================
// Handles & Errors
// =============================================================================

/// Handle to a node inside one [`Document`] generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Generation of the document that issued this handle.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Tree mutation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error(
        "stale node handle: issued by document generation {node}, current generation is {document}"
    )]
    StaleNode { node: u32, document: u32 },

    #[error("node does not exist in this document")]
    NotFound,

    #[error("node cannot be inserted here: {0}")]
    Hierarchy(&'static str),

    #[error("operation requires an element node")]
    NotAnElement,
}

// =============================================================================
// Node Data
// =============================================================================

/// A single ordered attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element name plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase local name (`script`, `img`, ...).
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype { name: String },
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<u32>,
    children: Vec<u32>,
    sanitize_bypass: bool,
}

impl Slot {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            sanitize_bypass: false,
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// An HTML document tree owned by one rewrite.
#[derive(Debug, Clone)]
pub struct Document {
    generation: u32,
    slots: Vec<Slot>,
}

const ROOT: u32 = 0;

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (generation 0).
    pub fn new() -> Self {
        Self {
            generation: 0,
            slots: vec![Slot::new(NodeData::Document)],
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Move the whole tree to a new generation. Every previously issued
    /// handle becomes stale.
    pub(crate) fn reissue(&mut self, generation: u32) {
        self.generation = generation;
    }

    #[inline]
    fn id(&self, index: u32) -> NodeId {
        NodeId {
            index,
            generation: self.generation,
        }
    }

    /// Validate a handle for mutation.
    fn check(&self, id: NodeId) -> Result<usize, DomError> {
        if id.generation != self.generation {
            return Err(DomError::StaleNode {
                node: id.generation,
                document: self.generation,
            });
        }
        let index = id.index as usize;
        if index >= self.slots.len() {
            return Err(DomError::NotFound);
        }
        Ok(index)
    }

    /// Validate a handle for reading; stale handles read as absent.
    #[inline]
    fn slot(&self, id: NodeId) -> Option<&Slot> {
        if id.generation != self.generation {
            return None;
        }
        self.slots.get(id.index as usize)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// The document node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.id(ROOT)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slot(id).map(|s| &s.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id)? {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Lowercase tag name of an element node.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Check whether `id` is an element with the given (lowercase) tag.
    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent.map(|p| self.id(p))
    }

    /// Snapshot of the child handles.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.slot(id)
            .map(|s| s.children.iter().map(|&c| self.id(c)).collect())
            .unwrap_or_default()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.children.first().map(|&c| self.id(c))
    }

    fn sibling(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.slot(id)?.parent?;
        let siblings = &self.slots[parent as usize].children;
        let pos = siblings.iter().position(|&c| c == id.index)?;
        let target = pos.checked_add_signed(offset)?;
        siblings.get(target).map(|&c| self.id(c))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, 1)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, -1)
    }

    /// Ancestors from the parent upward, ending with the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Whether the node is still reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if self.slot(id).is_none() {
            return false;
        }
        id.index == ROOT || self.ancestors(id).any(|a| a.index == ROOT)
    }

    /// Pre-order descendants of `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<u32> = match self.slot(id) {
            Some(s) => s.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(index) = stack.pop() {
            out.push(self.id(index));
            stack.extend(self.slots[index as usize].children.iter().rev());
        }
        out
    }

    /// First element with the given tag in document order.
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.is_element(n, tag))
    }

    /// All elements with the given tag in document order.
    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.is_element(n, tag))
            .collect()
    }

    /// The `<html>` element, if the document has one at the top level.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .into_iter()
            .find(|&n| self.is_element(n, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|&n| self.is_element(n, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|&n| self.is_element(n, "body"))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(NodeData::Text(t)) = self.data(id) {
            return t.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|n| match self.data(n) {
                Some(NodeData::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    fn push(&mut self, data: NodeData) -> NodeId {
        self.slots.push(Slot::new(data));
        self.id((self.slots.len() - 1) as u32)
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached element with attributes (order preserved).
    pub fn create_element_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }))
    }

    /// Create a detached element from parsed data, keeping the name as given.
    pub(crate) fn create_element_data(&mut self, data: ElementData) -> NodeId {
        self.push(NodeData::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::Doctype { name: name.into() })
    }

    /// Copy a node (and, when `deep`, its subtree) into a new detached node.
    ///
    /// The sanitize-bypass marker is not copied; use
    /// [`Document::copy_sanitize_bypass`] to carry it over explicitly.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId, DomError> {
        let index = self.check(id)?;
        let data = self.slots[index].data.clone();
        let copy = self.push(data);
        if deep {
            for child in self.children(id) {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy, child_copy)?;
            }
        }
        Ok(copy)
    }

    // -------------------------------------------------------------------------
    // Attribute mutation
    // -------------------------------------------------------------------------

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        let index = self.check(id)?;
        match &mut self.slots[index].data {
            NodeData::Element(e) => Ok(e),
            _ => Err(DomError::NotAnElement),
        }
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let value = value.into();
        let element = self.element_mut(id)?;
        match element
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = value,
            None => element.attrs.push(Attribute {
                name: name.to_ascii_lowercase(),
                value,
            }),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let element = self.element_mut(id)?;
        let pos = element
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name));
        Ok(pos.map(|p| element.attrs.remove(p).value))
    }

    /// Keep only the attributes for which `keep` returns true.
    /// Returns the number of removed attributes.
    pub fn retain_attrs(
        &mut self,
        id: NodeId,
        mut keep: impl FnMut(&Attribute) -> bool,
    ) -> Result<usize, DomError> {
        let element = self.element_mut(id)?;
        let before = element.attrs.len();
        element.attrs.retain(|a| keep(a));
        Ok(before - element.attrs.len())
    }

    /// Replace the payload of a text or comment node, or the children of an
    /// element with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        let index = self.check(id)?;
        let text = text.into();
        if matches!(self.slots[index].data, NodeData::Element(_)) {
            for child in self.children(id) {
                self.detach(child)?;
            }
            let node = self.create_text(text);
            return self.append_child(id, node);
        }
        match &mut self.slots[index].data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                *t = text;
                Ok(())
            }
            _ => Err(DomError::NotAnElement),
        }
    }

    // -------------------------------------------------------------------------
    // Structural mutation
    // -------------------------------------------------------------------------

    /// Remove a node from its parent. Detaching a detached node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let index = self.check(id)?;
        if index as u32 == ROOT {
            return Err(DomError::Hierarchy("the document node cannot be detached"));
        }
        if let Some(parent) = self.slots[index].parent.take() {
            self.slots[parent as usize]
                .children
                .retain(|&c| c != index as u32);
        }
        Ok(())
    }

    fn check_insert(&self, parent: usize, child: usize) -> Result<(), DomError> {
        if child as u32 == ROOT {
            return Err(DomError::Hierarchy("the document node cannot be inserted"));
        }
        if matches!(
            self.slots[parent].data,
            NodeData::Text(_) | NodeData::Comment(_) | NodeData::Doctype { .. }
        ) {
            return Err(DomError::Hierarchy("parent cannot have children"));
        }
        // Reject inserting a node into its own subtree
        let mut cursor = Some(parent as u32);
        while let Some(c) = cursor {
            if c == child as u32 {
                return Err(DomError::Hierarchy("node would become its own ancestor"));
            }
            cursor = self.slots[c as usize].parent;
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let p = self.check(parent)?;
        let c = self.check(child)?;
        self.check_insert(p, c)?;
        self.detach(child)?;
        self.slots[p].children.push(c as u32);
        self.slots[c].parent = Some(p as u32);
        Ok(())
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let p = self.check(parent)?;
        let c = self.check(child)?;
        self.check_insert(p, c)?;
        self.detach(child)?;
        self.slots[p].children.insert(0, c as u32);
        self.slots[c].parent = Some(p as u32);
        Ok(())
    }

    fn insert_relative(
        &mut self,
        reference: NodeId,
        node: NodeId,
        after: bool,
    ) -> Result<(), DomError> {
        let r = self.check(reference)?;
        let n = self.check(node)?;
        let parent = self.slots[r]
            .parent
            .ok_or(DomError::Hierarchy("reference node has no parent"))?;
        if r == n {
            return Ok(());
        }
        self.check_insert(parent as usize, n)?;
        self.detach(node)?;
        let siblings = &mut self.slots[parent as usize].children;
        let pos = siblings
            .iter()
            .position(|&c| c == r as u32)
            .ok_or(DomError::NotFound)?;
        siblings.insert(if after { pos + 1 } else { pos }, n as u32);
        self.slots[n].parent = Some(parent);
        Ok(())
    }

    /// Insert `node` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        self.insert_relative(reference, node, false)
    }

    /// Insert `node` immediately after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        self.insert_relative(reference, node, true)
    }

    /// Put `replacement` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> Result<(), DomError> {
        self.insert_before(old, replacement)?;
        self.detach(old)
    }

    // -------------------------------------------------------------------------
    // Sanitize bypass marker
    // -------------------------------------------------------------------------

    /// Mark a node as the root of a subtree the sanitizer must not touch.
    pub fn mark_sanitize_bypass(&mut self, id: NodeId) -> Result<(), DomError> {
        let index = self.check(id)?;
        self.slots[index].sanitize_bypass = true;
        Ok(())
    }

    pub fn is_sanitize_bypass(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|s| s.sanitize_bypass)
    }

    /// Carry the bypass marker from `from` over to `to` (e.g. onto a clone).
    pub fn copy_sanitize_bypass(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        let src = self.check(from)?;
        let dst = self.check(to)?;
        self.slots[dst].sanitize_bypass = self.slots[src].sanitize_bypass;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
