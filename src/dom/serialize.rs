//! Document → HTML string.
//!
//! Attribute values are always double-quoted; that is the only normalization
//! applied, so `serialize(parse(serialize(doc)))` is stable.

use super::{Document, NodeData, NodeId};
use crate::utils::html::{escape_attr, escape_text, is_raw_text_element, is_void_element};

/// Serialize the whole document.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, child, false, &mut out);
    }
    out
}

/// Serialize one node (outer HTML).
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc
        .parent(id)
        .and_then(|p| doc.tag_name(p))
        .is_some_and(is_raw_text_element);
    write_node(doc, id, raw, &mut out);
    out
}

/// Recursive writer; depth is bounded by the parser's nesting repair and the
/// size of a single HTTP response.
fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(data) = doc.data(id) else {
        return;
    };

    match data {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, child, false, out);
            }
        }
        NodeData::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            out.push('>');

            if is_void_element(&element.name) {
                return;
            }

            let raw = is_raw_text_element(&element.name);
            for child in doc.children(id) {
                write_node(doc, child, raw, out);
            }

            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
