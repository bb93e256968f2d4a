//! Shared fixtures for unit tests.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::cache::MemoryCache;
use crate::content::MutableContent;
use crate::dom::{Html5everParser, HtmlParser, serialize_node};
use crate::fetch::{FetchError, Fetcher, WorkerPool};
use crate::http::{HttpRequest, HttpResponse};
use crate::policy::{ContentRewriterFeature, FeatureDefaults, GadgetOverrides};
use crate::rewrite::RewriteContext;
use crate::rewrite::pipelines::Services;
use crate::uri::{DefaultConcatUriManager, DefaultProxyUriManager, UriBases};

pub const PROXY_BASE: &str = "http://proxy/proxy";
pub const CONCAT_BASE: &str = "http://proxy/concat";

pub fn parser() -> Arc<dyn HtmlParser> {
    Arc::new(Html5everParser::new())
}

pub fn content(html: &str) -> MutableContent {
    MutableContent::new(html, parser())
}

/// Content that always fails to parse.
pub fn oversized_content() -> MutableContent {
    MutableContent::new("<p>x</p>", Arc::new(Html5everParser::new().with_max_input_len(1)))
}

/// Default container, no gadget, default policy.
pub fn canonical() -> RewriteContext {
    RewriteContext::new("default")
}

/// Context with a gadget base URL.
pub fn gadget_ctx() -> RewriteContext {
    canonical().with_gadget(url("http://g.com/dir/gadget.xml"))
}

/// Context with a policy built from `defaults`.
pub fn ctx_with(defaults: FeatureDefaults) -> RewriteContext {
    canonical().with_feature(Arc::new(ContentRewriterFeature::new(
        &defaults,
        &GadgetOverrides::default(),
    )))
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn proxy_manager() -> Arc<DefaultProxyUriManager> {
    Arc::new(DefaultProxyUriManager::new(UriBases::new(url(PROXY_BASE))))
}

pub fn concat_manager() -> Arc<DefaultConcatUriManager> {
    Arc::new(DefaultConcatUriManager::new(UriBases::new(url(CONCAT_BASE))))
}

/// Stock services with an empty stub fetcher.
pub fn services() -> Services {
    services_with(StubFetcher::new())
}

pub fn services_with(fetcher: StubFetcher) -> Services {
    Services {
        proxy: proxy_manager(),
        concat: concat_manager(),
        responses: Arc::new(MemoryCache::new(16)),
        fetcher: Arc::new(fetcher),
        pool: Arc::new(WorkerPool::new(2).unwrap()),
    }
}

/// Serialized children of `<body>`.
pub fn body_html(content: &mut MutableContent) -> String {
    let doc = content.document().unwrap();
    let body = doc.body().unwrap();
    doc.children(body)
        .into_iter()
        .map(|child| serialize_node(doc, child))
        .collect()
}

/// Serialized children of `<head>`.
pub fn head_html(content: &mut MutableContent) -> String {
    let doc = content.document().unwrap();
    let head = doc.head().unwrap();
    doc.children(head)
        .into_iter()
        .map(|child| serialize_node(doc, child))
        .collect()
}

/// PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// In-memory fetcher recording every request.
#[derive(Default)]
pub struct StubFetcher {
    responses: FxHashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_owned(), (status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().push(request.url.to_string());
        match self.responses.get(request.url.as_str()) {
            Some((status, body)) => Ok(HttpResponse::new(
                *status,
                Vec::new(),
                body.clone(),
                Duration::from_secs(60),
            )),
            None => Err(FetchError::Transport(format!("no route to {}", request.url))),
        }
    }
}
