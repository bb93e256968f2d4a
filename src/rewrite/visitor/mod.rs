//! Concrete visitors.
//!
//! | Visitor                    | Status used           | Batch work in `revisit` |
//! |----------------------------|-----------------------|-------------------------|
//! | [`AbsolutePathVisitor`]    | `Modify`              | none                    |
//! | [`ProxyingVisitor`]        | `ReserveNode`         | proxy URIs, one batch   |
//! | [`ConcatVisitor`]          | `ReserveNode`         | concat URIs, one batch  |
//! | [`StyleAdjacencyVisitor`]  | `ReserveTree`         | move styles into head   |
//! | [`SanitizingVisitor`]      | `Modify`              | none                    |
//! | [`CacheEnforcementVisitor`]| `ReserveNode`         | background cache fills  |
//! | [`ImageAttributeVisitor`]  | `ReserveNode`         | parallel image fetches  |
//! | [`CssUrlVisitor`]          | `ReserveNode`         | proxy CSS references    |

mod absolute;
mod cache;
mod concat;
mod css;
mod image;
mod proxy;
mod sanitize;
mod style;

pub use absolute::{AbsolutePathVisitor, TagGroup};
pub use cache::CacheEnforcementVisitor;
pub use concat::ConcatVisitor;
pub use css::CssUrlVisitor;
pub use image::ImageAttributeVisitor;
pub use proxy::ProxyingVisitor;
pub use sanitize::SanitizingVisitor;
pub use style::StyleAdjacencyVisitor;

use crate::dom::{Document, NodeId};

/// Whether a `rel` attribute lists `token` (case-insensitive).
pub(crate) fn rel_contains(rel: &str, token: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|t| t.eq_ignore_ascii_case(token))
}

/// `<link rel=stylesheet>`.
pub(crate) fn is_stylesheet_link(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node, "link")
        && doc
            .attr(node, "rel")
            .is_some_and(|rel| rel_contains(rel, "stylesheet"))
}

/// Attribute holding the external resource an element loads, if any.
pub(crate) fn resource_attr(doc: &Document, node: NodeId) -> Option<&'static str> {
    let tag = doc.tag_name(node)?;
    let attr = match tag {
        "img" | "input" | "embed" | "script" | "audio" | "video" | "source" | "track" => "src",
        "link" => {
            let rel = doc.attr(node, "rel")?;
            if !["stylesheet", "icon", "shortcut", "apple-touch-icon"]
                .iter()
                .any(|t| rel_contains(rel, t))
            {
                return None;
            }
            "href"
        }
        "body" | "table" | "td" | "th" => "background",
        _ => return None,
    };
    doc.has_attr(node, attr).then_some(attr)
}

/// Attribute holding a navigation target, if any.
pub(crate) fn hyperlink_attr(doc: &Document, node: NodeId) -> Option<&'static str> {
    let attr = match doc.tag_name(node)? {
        "a" | "area" => "href",
        "form" => "action",
        _ => return None,
    };
    doc.has_attr(node, attr).then_some(attr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Html5everParser, HtmlParser};

    #[test]
    fn test_resource_attr() {
        let doc = Html5everParser::new()
            .parse(
                r#"<link rel="Stylesheet" href="a.css"><link rel="alternate" href="feed"><img src="x.png"><img><a href="y">y</a><body background="bg.png">"#,
            )
            .unwrap();
        let links = doc.find_all("link");
        assert_eq!(resource_attr(&doc, links[0]), Some("href"));
        assert!(is_stylesheet_link(&doc, links[0]));
        assert_eq!(resource_attr(&doc, links[1]), None);

        let imgs = doc.find_all("img");
        assert_eq!(resource_attr(&doc, imgs[0]), Some("src"));
        assert_eq!(resource_attr(&doc, imgs[1]), None);

        let a = doc.find_first("a").unwrap();
        assert_eq!(resource_attr(&doc, a), None);
        assert_eq!(hyperlink_attr(&doc, a), Some("href"));

        assert_eq!(resource_attr(&doc, doc.body().unwrap()), Some("background"));
    }
}
