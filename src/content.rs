//! Mutable content shared by every rewriter of one pipeline run.
//!
//! Holds two views of the same content, a string and a parsed [`Document`],
//! and keeps exactly one of them authoritative:
//!
//! ```text
//!   set_content(s)          document_changed()
//!        │                        │
//!        ▼                        ▼
//!   ┌─────────┐  document()  ┌──────────┐
//!   │ String  │ ───────────► │ Document │
//!   │  (auth) │ ◄─────────── │  (auth)  │
//!   └─────────┘  content()   └──────────┘
//! ```
//!
//! The other view is derived lazily, at most once per change. Every parse
//! issues a fresh document generation, so node handles taken before a
//! `set_content()` cannot be used against the re-parsed tree.

use std::sync::Arc;

use crate::dom::{Document, HtmlParser, serialize};
use crate::rewrite::RewriteError;

/// String + tree view of the content under rewrite.
pub struct MutableContent {
    parser: Arc<dyn HtmlParser>,
    /// Cached or authoritative string view.
    content: Option<String>,
    /// Parsed tree, authoritative once `document_changed()` was called.
    document: Option<Document>,
    /// Generation for the next parsed document.
    generation: u32,
    num_changes: u32,
}

impl std::fmt::Debug for MutableContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableContent")
            .field("has_content", &self.content.is_some())
            .field("has_document", &self.document.is_some())
            .field("generation", &self.generation)
            .field("num_changes", &self.num_changes)
            .finish()
    }
}

impl MutableContent {
    pub fn new(content: impl Into<String>, parser: Arc<dyn HtmlParser>) -> Self {
        Self {
            parser,
            content: Some(content.into()),
            document: None,
            generation: 0,
            num_changes: 0,
        }
    }

    /// String view; serializes the tree when the tree is authoritative.
    pub fn content(&mut self) -> &str {
        if self.content.is_none() {
            let serialized = self
                .document
                .as_ref()
                .map(serialize)
                .unwrap_or_default();
            self.content = Some(serialized);
        }
        self.content.as_deref().unwrap_or_default()
    }

    /// Replace the content. Drops the tree; previously issued node handles
    /// become stale.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
        if self.document.take().is_some() {
            self.generation += 1;
        }
        self.num_changes += 1;
    }

    fn ensure_document(&mut self) -> Result<(), RewriteError> {
        if self.document.is_none() {
            let source = self.content.as_deref().unwrap_or_default();
            let mut document = self.parser.parse(source)?;
            document.reissue(self.generation);
            self.document = Some(document);
        }
        Ok(())
    }

    /// Tree view; parses the string when no tree exists yet.
    pub fn document(&mut self) -> Result<&Document, RewriteError> {
        self.ensure_document()?;
        self.document.as_ref().ok_or(RewriteError::MissingDocument)
    }

    /// Mutable tree view. Call [`MutableContent::document_changed`] after
    /// mutating it.
    pub fn document_mut(&mut self) -> Result<&mut Document, RewriteError> {
        self.ensure_document()?;
        self.document.as_mut().ok_or(RewriteError::MissingDocument)
    }

    /// Notify that the tree was mutated directly. The tree becomes
    /// authoritative and the cached string is dropped.
    pub fn document_changed(&mut self) {
        if self.document.is_some() {
            self.content = None;
            self.num_changes += 1;
        }
    }

    /// Number of recorded changes (content sets and tree notifications).
    #[inline]
    pub fn num_changes(&self) -> u32 {
        self.num_changes
    }

    #[inline]
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Generation the current (or next) document is issued under.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Consume and return the final string view.
    pub fn into_content(mut self) -> String {
        self.content();
        self.content.unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomError, Html5everParser, ParseError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Parser wrapper counting how often parsing happens.
    #[derive(Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    impl HtmlParser for CountingParser {
        fn parse(&self, source: &str) -> Result<Document, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Html5everParser::new().parse(source)
        }
    }

    struct FailingParser;

    impl HtmlParser for FailingParser {
        fn parse(&self, _source: &str) -> Result<Document, ParseError> {
            Err(ParseError::Malformed("nope".into()))
        }
    }

    const CANONICAL: &str = r#"<html><head></head><body><p class="a">text</p></body></html>"#;

    #[test]
    fn test_roundtrip_without_mutation() {
        let mut content = MutableContent::new(CANONICAL, Arc::new(Html5everParser::new()));
        content.document().unwrap();
        assert_eq!(content.content(), CANONICAL);
        // Reading the tree alone does not count as a change
        assert_eq!(content.num_changes(), 0);
    }

    #[test]
    fn test_parse_is_lazy_and_cached() {
        let parser = Arc::new(CountingParser::default());
        let mut content = MutableContent::new(CANONICAL, parser.clone());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);

        content.document().unwrap();
        content.document().unwrap();
        content.document_mut().unwrap();
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);

        content.set_content("<p>new</p>");
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        content.document().unwrap();
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_document_changed_reserializes() {
        let mut content = MutableContent::new(CANONICAL, Arc::new(Html5everParser::new()));
        let doc = content.document_mut().unwrap();
        let p = doc.find_first("p").unwrap();
        doc.set_attr(p, "class", "b").unwrap();

        // Without the notification the cached string is still served
        assert_eq!(content.content(), CANONICAL);

        content.document_changed();
        assert_eq!(content.num_changes(), 1);
        assert!(content.content().contains(r#"<p class="b">"#));
    }

    #[test]
    fn test_set_content_makes_old_handles_stale() {
        let mut content = MutableContent::new(CANONICAL, Arc::new(Html5everParser::new()));
        let old_p = content.document().unwrap().find_first("p").unwrap();

        content.set_content("<p>again</p>");
        let doc = content.document_mut().unwrap();
        assert!(matches!(
            doc.set_attr(old_p, "x", "y"),
            Err(DomError::StaleNode { .. })
        ));

        let new_p = doc.find_first("p").unwrap();
        assert_ne!(new_p.generation(), old_p.generation());
        doc.set_attr(new_p, "x", "y").unwrap();
    }

    #[test]
    fn test_set_content_without_tree_keeps_generation() {
        let mut content = MutableContent::new("a", Arc::new(Html5everParser::new()));
        content.set_content("b");
        assert_eq!(content.generation(), 0);
        assert_eq!(content.content(), "b");
        assert_eq!(content.num_changes(), 1);
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let mut content = MutableContent::new("<p>", Arc::new(FailingParser));
        let err = content.document().unwrap_err();
        assert!(matches!(err, RewriteError::Parse(_)));
        assert_eq!(err.status_code(), 500);
        // String view is still available
        assert_eq!(content.content(), "<p>");
    }
}
