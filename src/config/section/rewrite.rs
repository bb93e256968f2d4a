//! `[rewrite]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [rewrite]
//! include_urls = ["*"]        # Substring patterns; "*" matches everything
//! exclude_urls = []           # Checked first, always wins
//! include_tags = ["img", "script", "link", "style", "embed", "input", "body"]
//! expires = "HTTP"            # "HTTP" or a number of seconds
//! min_cache_ttl = 300         # Shorter-lived results are not cached
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::policy::{DEFAULT_INCLUDE_TAGS, Expires, MATCH_ALL};

/// `expires` as written in TOML: a bare number or a keyword string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiresSetting {
    Seconds(u64),
    Keyword(String),
}

impl ExpiresSetting {
    /// `None` for keywords other than `HTTP` or a numeric string.
    pub fn resolve(&self) -> Option<Expires> {
        match self {
            Self::Seconds(secs) => Some(Expires::Seconds(*secs)),
            Self::Keyword(keyword) => Expires::parse(keyword),
        }
    }
}

impl Default for ExpiresSetting {
    fn default() -> Self {
        Self::Keyword("HTTP".to_owned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub include_urls: Vec<String>,
    pub exclude_urls: Vec<String>,
    pub include_tags: Vec<String>,
    pub expires: ExpiresSetting,
    /// Seconds.
    pub min_cache_ttl: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            include_urls: vec![MATCH_ALL.to_owned()],
            exclude_urls: Vec::new(),
            include_tags: DEFAULT_INCLUDE_TAGS.iter().map(|t| (*t).to_owned()).collect(),
            expires: ExpiresSetting::default(),
            min_cache_ttl: 300,
        }
    }
}

impl RewriteConfig {
    pub const EXPIRES: FieldPath = FieldPath::new("rewrite.expires");
    pub const INCLUDE_URLS: FieldPath = FieldPath::new("rewrite.include_urls");
    pub const INCLUDE_TAGS: FieldPath = FieldPath::new("rewrite.include_tags");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_expires(&self.expires, Self::EXPIRES, diag);
        if self.include_urls.is_empty() {
            diag.warn(Self::INCLUDE_URLS, "empty list, no URL will be rewritten");
        }
        if self.include_tags.is_empty() {
            diag.warn(Self::INCLUDE_TAGS, "empty list, no tag will be rewritten");
        }
    }
}

pub(crate) fn validate_expires(
    expires: &ExpiresSetting,
    field: FieldPath,
    diag: &mut ConfigDiagnostics,
) {
    if expires.resolve().is_none() {
        diag.error_with_hint(
            field,
            format!("invalid value {expires:?}"),
            "use \"HTTP\" or a number of seconds",
        );
    }
}
