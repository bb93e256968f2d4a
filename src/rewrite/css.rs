//! URL references inside CSS.
//!
//! Two reference forms are recognized:
//!
//! ```text
//! url(x)  url("x")  url('x')      any property value, @import url(..)
//! @import "x"  @import 'x'        bare string import
//! ```
//!
//! [`proxy_stylesheets`] routes every eligible reference of any number of
//! stylesheets through one proxy batch. It backs both the `<style>` visitor
//! and [`CssResponseRewriter`], which works on a standalone CSS response.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;

use super::{RewriteContext, RewriteError, Rewriter};
use crate::content::MutableContent;
use crate::uri::{ProxyUri, ProxyUriManager};

// CSS whitespace only; the regex crate is built without Unicode classes
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\([ \t\n\r\x0C]*(?:"([^"]*)"|'([^']*)'|([^'") \t\n\r\x0C]*))[ \t\n\r\x0C]*\)"#)
        .unwrap()
});

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import[ \t\n\r\x0C]+(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// One reference found in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CssReference {
    /// Byte range of the whole token (`url(..)` or `@import ".."`).
    pub range: Range<usize>,
    pub value: String,
    pub import: bool,
}

impl CssReference {
    /// The token with its reference replaced by `url`.
    pub fn render(&self, url: &str) -> String {
        if self.import {
            format!("@import \"{url}\"")
        } else {
            format!("url(\"{url}\")")
        }
    }
}

/// All references in `css`, in source order and non-overlapping. A match
/// nested inside an earlier one (`@import "url(x)"`) is dropped.
pub(crate) fn references(css: &str) -> Vec<CssReference> {
    let capture = |caps: &regex::Captures<'_>, import: bool| {
        let whole = caps.get(0)?;
        let value = (1..=3).find_map(|i| caps.get(i))?;
        Some(CssReference {
            range: whole.range(),
            value: value.as_str().trim().to_owned(),
            import,
        })
    };

    let mut found: Vec<CssReference> = CSS_URL
        .captures_iter(css)
        .filter_map(|caps| capture(&caps, false))
        .chain(
            CSS_IMPORT
                .captures_iter(css)
                .filter_map(|caps| capture(&caps, true)),
        )
        .filter(|r| !r.value.is_empty())
        .collect();
    found.sort_by_key(|r| r.range.start);

    let mut end = 0;
    found.retain(|r| {
        let keep = r.range.start >= end;
        if keep {
            end = r.range.end;
        }
        keep
    });
    found
}

fn eligible(ctx: &RewriteContext, manager: &dyn ProxyUriManager, value: &str) -> Option<Url> {
    let url = ctx.resolve(value)?;
    if !matches!(url.scheme(), "http" | "https")
        || manager.is_proxied(&url)
        || !ctx.feature.should_rewrite_url(url.as_str())
    {
        return None;
    }
    Some(url)
}

/// Proxy every eligible reference across `sheets` with one batch call.
/// Returns the rewritten text per sheet, `None` where nothing changed.
pub(crate) fn proxy_stylesheets(
    ctx: &RewriteContext,
    manager: &dyn ProxyUriManager,
    sheets: &[&str],
    tag: Option<&str>,
) -> Vec<Option<String>> {
    let found: Vec<Vec<CssReference>> = sheets
        .iter()
        .map(|css| {
            references(css)
                .into_iter()
                .filter(|r| eligible(ctx, manager, &r.value).is_some())
                .collect()
        })
        .collect();

    let resources: Vec<ProxyUri> = found
        .iter()
        .flatten()
        .filter_map(|r| eligible(ctx, manager, &r.value))
        .map(|url| match tag {
            Some(tag) => ProxyUri::new(url).with_tag(tag),
            None => ProxyUri::new(url),
        })
        .collect();
    if resources.is_empty() {
        return vec![None; sheets.len()];
    }

    let mut built = manager.batch_build_proxy_uris(ctx, &resources).into_iter();
    sheets
        .iter()
        .zip(found)
        .map(|(css, refs)| {
            let mut out = String::with_capacity(css.len());
            let mut last = 0;
            let mut changed = false;
            for reference in refs {
                let Some(Some(proxied)) = built.next() else {
                    continue;
                };
                out.push_str(&css[last..reference.range.start]);
                out.push_str(&reference.render(proxied.as_str()));
                last = reference.range.end;
                changed = true;
            }
            changed.then(|| {
                out.push_str(&css[last..]);
                out
            })
        })
        .collect()
}

/// Rewrites the references of a CSS response body through the proxy.
pub struct CssResponseRewriter {
    manager: Arc<dyn ProxyUriManager>,
}

impl CssResponseRewriter {
    pub fn new(manager: Arc<dyn ProxyUriManager>) -> Self {
        Self { manager }
    }
}

impl Rewriter for CssResponseRewriter {
    fn id(&self) -> String {
        "css-response".to_owned()
    }

    fn rewrite(
        &self,
        ctx: &RewriteContext,
        content: &mut MutableContent,
    ) -> Result<bool, RewriteError> {
        let rewritten = proxy_stylesheets(ctx, self.manager.as_ref(), &[content.content()], None);
        match rewritten.into_iter().next().flatten() {
            Some(css) => {
                content.set_content(css);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
