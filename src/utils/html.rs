//! HTML utility functions.
//!
//! Provides the helpers the serializer and the visitors share:
//! - `escape_text()`, `escape_attr()` - HTML entity escaping
//! - `is_void_element()` - Elements without end tags (br, img, etc.)
//! - `is_raw_text_element()` - Elements whose text is emitted verbatim
//! - `is_structural_element()` - Document skeleton (html, head, body)

use std::borrow::Cow;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters that require escaping in text content.
const TEXT_ESCAPE_CHARS: [char; 4] = ['<', '>', '&', '\u{00A0}'];

/// Characters that require escaping in double-quoted attribute values.
const ATTR_ESCAPE_CHARS: [char; 3] = ['&', '"', '\u{00A0}'];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char, in_attr: bool) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '\u{00A0}' => Some("&nbsp;"),
        '"' if in_attr => Some("&quot;"),
        '<' if !in_attr => Some("&lt;"),
        '>' if !in_attr => Some("&gt;"),
        _ => None,
    }
}

/// Escape HTML special characters in text content.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
///
/// # Example
/// ```ignore
/// assert_eq!(escape_text("<b>"), "&lt;b&gt;");
/// assert_eq!(escape_text("hello"), "hello"); // No allocation
/// ```
#[inline]
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_with(s, &TEXT_ESCAPE_CHARS, false)
}

/// Escape a value for a double-quoted attribute.
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, &ATTR_ESCAPE_CHARS, true)
}

#[inline]
fn escape_with<'a>(s: &'a str, chars: &[char], in_attr: bool) -> Cow<'a, str> {
    if !s.contains(chars) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match escape_char(c, in_attr) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape a string for embedding in a single-quoted JavaScript string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            c => out.push(c),
        }
    }
    out
}

// =============================================================================
// Element Classification
// =============================================================================

/// Check if an HTML tag is a void element (no end tag, no children).
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "basefont"
            | "bgsound"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Check if tag content is raw text (emitted without escaping).
///
/// Covers the raw text elements plus the legacy elements the HTML
/// serializer treats the same way.
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext" | "noscript"
    )
}

/// Document skeleton elements that a sanitizer never removes.
#[inline]
pub fn is_structural_element(tag: &str) -> bool {
    matches!(tag, "html" | "head" | "body")
}

/// Check whether a text run is made of HTML whitespace only.
#[inline]
pub fn is_html_whitespace(s: &str) -> bool {
    s.chars()
        .all(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000C}'))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_text("hello world"), "hello world");
        assert!(matches!(escape_text("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_text_special_chars() {
        assert_eq!(escape_text("<script>"), "&lt;script&gt;");
        assert_eq!(escape_text("a & b"), "a &amp; b");
        // Quotes are fine in text content
        assert_eq!(escape_text("say \"hi\""), "say \"hi\"");
        assert_eq!(escape_text("a\u{00A0}b"), "a&nbsp;b");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("normal"), "normal");
        assert_eq!(escape_attr("a\"b&c"), "a&quot;b&amp;c");
        // Angle brackets are fine inside a quoted attribute
        assert_eq!(escape_attr("<x>"), "<x>");
    }

    #[test]
    fn test_escape_js_string() {
        assert_eq!(escape_js_string("http://a.com/1.js"), "http://a.com/1.js");
        assert_eq!(escape_js_string("it's"), "it\\'s");
        assert_eq!(escape_js_string("</script>"), "\\x3c/script\\x3e");
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("img"));
        assert!(is_void_element("link"));
        assert!(!is_void_element("div"));
        assert!(!is_void_element("script"));
    }

    #[test]
    fn test_raw_text_elements() {
        assert!(is_raw_text_element("script"));
        assert!(is_raw_text_element("style"));
        assert!(!is_raw_text_element("div"));
        assert!(!is_raw_text_element("textarea"));
    }

    #[test]
    fn test_whitespace() {
        assert!(is_html_whitespace(" \n\t "));
        assert!(is_html_whitespace(""));
        assert!(!is_html_whitespace(" x "));
    }
}
