//! Concat URI construction.
//!
//! A batch of adjacent same-type resources becomes one or more concat URLs:
//!
//! ```text
//! {common}&type=js[&json=_js]&1=..&2=..&3=..
//! ```
//!
//! Batches whose URL would exceed the configured length are split greedily
//! into the fewest ordered segments that fit. A resource too long to fit on
//! its own gets a segment without a URI and stays as it is.

use url::Url;

use super::{UriBases, common_prefix, encode};
use crate::rewrite::RewriteContext;

/// Kind of resources in one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcatType {
    Js,
    Css,
}

impl ConcatType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }
}

/// Adjacent resources to concatenate, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatBatch {
    pub kind: ConcatType,
    pub urls: Vec<Url>,
}

/// One concat URL covering `len` consecutive resources of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatSegment {
    /// `None` when the resource cannot be concatenated within the budget.
    pub uri: Option<Url>,
    pub len: usize,
}

/// Ordered segments covering a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatData {
    pub segments: Vec<ConcatSegment>,
}

impl ConcatData {
    /// Total resources covered.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Builds concat URLs in batches.
pub trait ConcatUriManager: Send + Sync {
    /// One result per batch, in input order. `None` declines the batch.
    fn batch_build_concat_uris(
        &self,
        ctx: &RewriteContext,
        batches: &[ConcatBatch],
    ) -> Vec<Option<ConcatData>>;

    /// Whether `url` already points at the concat endpoint.
    fn is_concat(&self, url: &Url) -> bool;
}

#[derive(Debug, Clone)]
pub struct DefaultConcatUriManager {
    bases: UriBases,
}

impl DefaultConcatUriManager {
    pub fn new(bases: UriBases) -> Self {
        Self { bases }
    }

    fn build(&self, ctx: &RewriteContext, batch: &ConcatBatch) -> Option<ConcatData> {
        if batch.urls.is_empty() {
            return None;
        }

        let concat = ctx.feature.concat();
        let mut prefix = common_prefix(self.bases.base_for(&ctx.container), ctx);
        prefix.push_str("&type=");
        prefix.push_str(batch.kind.as_str());
        if batch.kind == ConcatType::Js && concat.split_js {
            prefix.push_str("&json=_js");
        }

        let max_len = concat.max_url_length;
        let mut segments = Vec::new();
        let mut current = prefix.clone();
        let mut count = 0usize;

        for url in &batch.urls {
            let encoded = encode(url.as_str());
            let param = format!("&{}={}", count + 1, encoded);
            if count > 0 && current.len() + param.len() <= max_len {
                current.push_str(&param);
                count += 1;
                continue;
            }

            if count > 0 {
                segments.push(finish(std::mem::replace(&mut current, prefix.clone()), count));
                count = 0;
            }

            let first = format!("&1={encoded}");
            if prefix.len() + first.len() > max_len {
                segments.push(ConcatSegment { uri: None, len: 1 });
                continue;
            }
            current.push_str(&first);
            count = 1;
        }
        if count > 0 {
            segments.push(finish(current, count));
        }

        Some(ConcatData { segments })
    }
}

fn finish(uri: String, len: usize) -> ConcatSegment {
    ConcatSegment {
        uri: Url::parse(&uri).ok(),
        len,
    }
}

impl ConcatUriManager for DefaultConcatUriManager {
    fn batch_build_concat_uris(
        &self,
        ctx: &RewriteContext,
        batches: &[ConcatBatch],
    ) -> Vec<Option<ConcatData>> {
        batches.iter().map(|b| self.build(ctx, b)).collect()
    }

    fn is_concat(&self, url: &Url) -> bool {
        self.bases.is_base(url)
    }
}
