//! Fill in missing `<img>` dimensions from the image itself.
//!
//! All reserved images are fetched in parallel on the worker pool and the
//! walk waits for the whole batch. When one side is given the other keeps
//! the natural aspect ratio:
//!
//! ```text
//! natural 200x100, width="50"   → height="25"
//! natural 200x100, nothing      → width="200" height="100"
//! ```

use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;
use url::Url;

use crate::dom::{Document, NodeId};
use crate::fetch::{FetchError, Fetcher, WorkerPool};
use crate::http::{HttpRequest, HttpResponse};
use crate::rewrite::{RewriteContext, RewriteError, VisitStatus, Visitor};

pub struct ImageAttributeVisitor {
    fetcher: Arc<dyn Fetcher>,
    pool: Arc<WorkerPool>,
}

impl ImageAttributeVisitor {
    pub fn new(fetcher: Arc<dyn Fetcher>, pool: Arc<WorkerPool>) -> Self {
        Self { fetcher, pool }
    }

    fn target(ctx: &RewriteContext, doc: &Document, node: NodeId) -> Option<Url> {
        if !doc.is_element(node, "img") {
            return None;
        }
        if doc.has_attr(node, "width") && doc.has_attr(node, "height") {
            return None;
        }
        let url = ctx.resolve(doc.attr(node, "src")?)?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}

/// Natural size of an encoded image, if the format is recognized.
fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
        .filter(|&(w, h)| w > 0 && h > 0)
}

/// Pixel length of a `width`/`height` attribute (`"50"`, `"50px"`).
fn pixels(value: &str) -> Option<u32> {
    let value = value.trim();
    value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
}

fn scale(length: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (u64::from(length) * u64::from(numerator) + u64::from(denominator) / 2)
        / u64::from(denominator);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Set whichever of width/height is missing. Returns whether anything changed.
fn fill(doc: &mut Document, node: NodeId, natural: (u32, u32)) -> Result<bool, RewriteError> {
    let (nw, nh) = natural;
    let width = doc.attr(node, "width").map(pixels);
    let height = doc.attr(node, "height").map(pixels);

    let (new_width, new_height) = match (width, height) {
        (None, None) => (Some(nw), Some(nh)),
        (Some(Some(w)), None) => (None, Some(scale(w, nh, nw))),
        (Some(None), None) => (None, Some(nh)),
        (None, Some(Some(h))) => (Some(scale(h, nw, nh)), None),
        (None, Some(None)) => (Some(nw), None),
        (Some(_), Some(_)) => (None, None),
    };

    if let Some(w) = new_width {
        doc.set_attr(node, "width", w.to_string())?;
    }
    if let Some(h) = new_height {
        doc.set_attr(node, "height", h.to_string())?;
    }
    Ok(new_width.is_some() || new_height.is_some())
}

impl Visitor for ImageAttributeVisitor {
    fn name(&self) -> &'static str {
        "image-size"
    }

    fn visit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        node: NodeId,
    ) -> Result<VisitStatus, RewriteError> {
        Ok(match Self::target(ctx, doc, node) {
            Some(_) => VisitStatus::ReserveNode,
            None => VisitStatus::Bypass,
        })
    }

    fn revisit(
        &self,
        ctx: &RewriteContext,
        doc: &mut Document,
        nodes: &[NodeId],
    ) -> Result<bool, RewriteError> {
        let targets: Vec<(NodeId, Url)> = nodes
            .iter()
            .filter_map(|&n| Some((n, Self::target(ctx, doc, n)?)))
            .collect();
        if targets.is_empty() {
            return Ok(false);
        }

        let fetcher = self.fetcher.as_ref();
        let results: Vec<Result<HttpResponse, FetchError>> =
            self.pool.map_join(&targets, |(_, url)| {
                let request = HttpRequest::new(url.clone())
                    .with_container(ctx.container.clone())
                    .with_gadget(ctx.gadget.clone())
                    .with_ignore_cache(ctx.ignore_cache);
                fetcher.fetch(&request)
            });

        let mut changed = false;
        for ((node, url), result) in targets.into_iter().zip(results) {
            let response = result.map_err(|source| RewriteError::Fetch {
                url: url.to_string(),
                source,
            })?;
            if response.is_error() {
                crate::debug!("image"; "{} answered {}, skipping", url, response.status);
                continue;
            }
            let Some(natural) = dimensions(&response.body) else {
                crate::debug!("image"; "cannot decode {}, skipping", url);
                continue;
            };
            changed |= fill(doc, node, natural)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{DomWalker, Rewriter};
    use crate::test_support::{StubFetcher, body_html, canonical, content, png};

    fn run(fetcher: StubFetcher, html: &str) -> Result<(bool, String), RewriteError> {
        let pool = Arc::new(WorkerPool::new(4).unwrap());
        let visitor = ImageAttributeVisitor::new(Arc::new(fetcher), pool);
        let walker = DomWalker::new(vec![Arc::new(visitor)]);
        let mut content = content(html);
        let changed = walker.rewrite(&canonical(), &mut content)?;
        Ok((changed, body_html(&mut content)))
    }

    #[test]
    fn test_fills_dimensions() {
        let fetcher = StubFetcher::new()
            .with("http://a.com/a.png", 200, png(200, 100))
            .with("http://a.com/b.png", 200, png(200, 100))
            .with("http://a.com/c.png", 200, png(200, 100));
        let (changed, body) = run(
            fetcher,
            concat!(
                r#"<img src="http://a.com/a.png">"#,
                r#"<img src="http://a.com/b.png" width="50">"#,
                r#"<img src="http://a.com/c.png" height="10px">"#,
            ),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(
            body,
            concat!(
                r#"<img src="http://a.com/a.png" width="200" height="100">"#,
                r#"<img src="http://a.com/b.png" width="50" height="25">"#,
                r#"<img src="http://a.com/c.png" height="10px" width="20">"#,
            )
        );
    }

    #[test]
    fn test_complete_images_not_fetched() {
        let fetcher = StubFetcher::new();
        let (changed, _) = run(
            fetcher,
            r#"<img src="http://a.com/a.png" width="1" height="1">"#,
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_undecodable_left_alone() {
        let fetcher = StubFetcher::new().with("http://a.com/a.png", 200, "not an image");
        let (changed, body) = run(fetcher, r#"<img src="http://a.com/a.png">"#).unwrap();
        assert!(!changed);
        assert_eq!(body, r#"<img src="http://a.com/a.png">"#);
    }

    #[test]
    fn test_fetch_error_aborts() {
        let err = run(StubFetcher::new(), r#"<img src="http://a.com/missing.png">"#).unwrap_err();
        assert!(matches!(err, RewriteError::Fetch { ref url, .. } if url == "http://a.com/missing.png"));
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(50, 100, 200), 25);
        assert_eq!(scale(1, 1, 3), 0);
        assert_eq!(scale(2, 1, 3), 1);
        assert_eq!(pixels(" 12px "), Some(12));
        assert_eq!(pixels("50%"), None);
    }
}
