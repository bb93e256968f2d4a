//! Rewrite policy objects.
//!
//! A [`ContentRewriterFeature`] is the effective policy for one gadget:
//! container defaults ([`FeatureDefaults`]) merged with the gadget's own
//! content-rewrite params ([`GadgetOverrides`]). It is immutable once built
//! and shared between threads behind an `Arc`.
//!
//! # Precedence
//!
//! | Setting        | Merge rule                                          |
//! |----------------|-----------------------------------------------------|
//! | `include_urls` | gadget list replaces container list when non-empty  |
//! | `exclude_urls` | union of container and gadget lists                 |
//! | `include_tags` | gadget list replaces container list when non-empty  |
//! | `expires`      | gadget value wins when present                      |
//! | `split_js`     | gadget value wins when present                      |
//!
//! Excludes always win over includes, so they only ever narrow the set of
//! rewritten URLs.

mod sanitize;

pub use sanitize::{
    DEFAULT_ALLOWED_ATTRIBUTES, DEFAULT_ALLOWED_SCHEMES, DEFAULT_ALLOWED_TAGS, SanitizePolicy,
    URL_ATTRIBUTES,
};

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::hash::ContentHash;

/// Pattern matching every URL.
pub const MATCH_ALL: &str = "*";

/// Tags whose resources are rewritten unless configured otherwise.
pub const DEFAULT_INCLUDE_TAGS: &[&str] =
    &["img", "script", "link", "style", "embed", "input", "body"];

pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

// ============================================================================
// Expires
// ============================================================================

/// Cache lifetime for rewritten resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expires {
    /// Follow the upstream HTTP caching headers.
    #[default]
    Http,
    /// Fixed lifetime in seconds.
    Seconds(u64),
}

impl Expires {
    /// Parse `HTTP` (any case) or a number of seconds, capped at
    /// [`MAX_TTL`](crate::cache::MAX_TTL).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("http") {
            return Some(Self::Http);
        }
        value
            .parse::<u64>()
            .ok()
            .map(|secs| Self::Seconds(secs.min(crate::cache::MAX_TTL.as_secs())))
    }

    /// Fixed lifetime, if any.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Http => None,
            Self::Seconds(secs) => Some(Duration::from_secs(secs).min(crate::cache::MAX_TTL)),
        }
    }
}

impl std::fmt::Display for Expires {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("HTTP"),
            Self::Seconds(secs) => write!(f, "{secs}"),
        }
    }
}

// ============================================================================
// Concat switches
// ============================================================================

/// Resource concatenation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatPolicy {
    pub enable: bool,
    /// Emit one evaluator `<script>` per original resource after the
    /// concatenated one.
    pub split_js: bool,
    /// Concatenate every resource on its own.
    pub single_resource: bool,
    /// Budget for one concat URL.
    pub max_url_length: usize,
}

impl Default for ConcatPolicy {
    fn default() -> Self {
        Self {
            enable: true,
            split_js: false,
            single_resource: false,
            max_url_length: DEFAULT_MAX_URL_LENGTH,
        }
    }
}

// ============================================================================
// Container defaults and gadget overrides
// ============================================================================

/// Container-level defaults, usually built from the config file.
#[derive(Debug, Clone)]
pub struct FeatureDefaults {
    pub include_urls: Vec<String>,
    pub exclude_urls: Vec<String>,
    pub include_tags: Vec<String>,
    pub expires: Expires,
    pub concat: ConcatPolicy,
    pub sanitize: Arc<SanitizePolicy>,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            include_urls: vec![MATCH_ALL.to_owned()],
            exclude_urls: Vec::new(),
            include_tags: DEFAULT_INCLUDE_TAGS.iter().map(|t| (*t).to_owned()).collect(),
            expires: Expires::Http,
            concat: ConcatPolicy::default(),
            sanitize: Arc::new(SanitizePolicy::default()),
        }
    }
}

/// Per-gadget content-rewrite params.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GadgetOverrides {
    pub include_urls: Vec<String>,
    pub exclude_urls: Vec<String>,
    pub include_tags: Vec<String>,
    pub expires: Option<Expires>,
    pub split_js: Option<bool>,
}

impl GadgetOverrides {
    /// Build from feature params (`include-urls`, `exclude-urls`,
    /// `include-tags`, `expires`, `enable-split-js`). List values are
    /// comma-separated; unknown params and unparsable values are ignored.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut overrides = Self::default();
        for (name, value) in params {
            match name.trim().to_ascii_lowercase().as_str() {
                "include-urls" => overrides.include_urls = split_list(value),
                "exclude-urls" => overrides.exclude_urls = split_list(value),
                "include-tags" => {
                    overrides.include_tags = split_list(value)
                        .into_iter()
                        .map(|t| t.to_ascii_lowercase())
                        .collect();
                }
                "expires" => overrides.expires = Expires::parse(value),
                "enable-split-js" => overrides.split_js = value.trim().parse().ok(),
                other => crate::debug!("policy"; "ignoring content-rewrite param `{}`", other),
            }
        }
        overrides
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ============================================================================
// ContentRewriterFeature
// ============================================================================

/// Effective, immutable rewrite policy for one gadget.
#[derive(Debug, Clone)]
pub struct ContentRewriterFeature {
    include_all: bool,
    include_urls: Vec<String>,
    exclude_all: bool,
    exclude_urls: Vec<String>,
    include_tags: FxHashSet<String>,
    expires: Expires,
    concat: ConcatPolicy,
    sanitize: Arc<SanitizePolicy>,
    fingerprint: ContentHash,
}

impl Default for ContentRewriterFeature {
    fn default() -> Self {
        Self::new(&FeatureDefaults::default(), &GadgetOverrides::default())
    }
}

impl ContentRewriterFeature {
    pub fn new(defaults: &FeatureDefaults, overrides: &GadgetOverrides) -> Self {
        let include_urls = if overrides.include_urls.is_empty() {
            defaults.include_urls.clone()
        } else {
            overrides.include_urls.clone()
        };

        let mut exclude_urls = defaults.exclude_urls.clone();
        for url in &overrides.exclude_urls {
            if !exclude_urls.contains(url) {
                exclude_urls.push(url.clone());
            }
        }

        let include_tags: FxHashSet<String> = if overrides.include_tags.is_empty() {
            &defaults.include_tags
        } else {
            &overrides.include_tags
        }
        .iter()
        .map(|t| t.to_ascii_lowercase())
        .collect();

        let expires = overrides.expires.unwrap_or(defaults.expires);
        let concat = ConcatPolicy {
            split_js: overrides.split_js.unwrap_or(defaults.concat.split_js),
            ..defaults.concat
        };

        let mut sorted_tags: Vec<&str> = include_tags.iter().map(String::as_str).collect();
        sorted_tags.sort_unstable();
        let sanitize = &defaults.sanitize;
        let fingerprint = ContentHash::builder()
            .parts(&include_urls)
            .parts(&exclude_urls)
            .parts(&sorted_tags)
            .part(expires.to_string())
            .part([
                concat.enable as u8,
                concat.split_js as u8,
                concat.single_resource as u8,
            ])
            .part((concat.max_url_length as u64).to_le_bytes())
            .parts(sanitize.sorted_tags())
            .parts(sanitize.sorted_attributes())
            .parts(sanitize.sorted_schemes())
            .finish();

        Self {
            include_all: include_urls.iter().any(|u| u == MATCH_ALL),
            include_urls,
            exclude_all: exclude_urls.iter().any(|u| u == MATCH_ALL),
            exclude_urls,
            include_tags,
            expires,
            concat,
            sanitize: Arc::clone(&defaults.sanitize),
            fingerprint,
        }
    }

    /// Whether a resource URL may be rewritten. Patterns match as substrings;
    /// excludes are checked first.
    pub fn should_rewrite_url(&self, url: &str) -> bool {
        if self.exclude_all || self.exclude_urls.iter().any(|p| url.contains(p.as_str())) {
            return false;
        }
        self.include_all || self.include_urls.iter().any(|p| url.contains(p.as_str()))
    }

    /// Whether resources on this tag may be rewritten.
    pub fn should_rewrite_tag(&self, tag: &str) -> bool {
        self.include_tags.contains(&tag.to_ascii_lowercase())
    }

    #[inline]
    pub fn expires(&self) -> Expires {
        self.expires
    }

    #[inline]
    pub fn concat(&self) -> &ConcatPolicy {
        &self.concat
    }

    #[inline]
    pub fn sanitize(&self) -> &SanitizePolicy {
        &self.sanitize
    }

    /// Stable hash of every effective setting.
    #[inline]
    pub fn fingerprint(&self) -> ContentHash {
        self.fingerprint
    }
}

// ============================================================================
// FeatureProvider
// ============================================================================

/// Source of effective policies.
pub trait FeatureProvider: Send + Sync {
    fn feature(&self, container: &str, overrides: &GadgetOverrides) -> Arc<ContentRewriterFeature>;
}

/// Provider backed by per-container defaults with a fallback.
#[derive(Debug, Clone, Default)]
pub struct ContainerFeatureProvider {
    fallback: FeatureDefaults,
    containers: FxHashMap<String, FeatureDefaults>,
}

impl ContainerFeatureProvider {
    pub fn new(fallback: FeatureDefaults) -> Self {
        Self {
            fallback,
            containers: FxHashMap::default(),
        }
    }

    pub fn with_container(mut self, name: impl Into<String>, defaults: FeatureDefaults) -> Self {
        self.containers.insert(name.into(), defaults);
        self
    }

    pub fn defaults_for(&self, container: &str) -> &FeatureDefaults {
        self.containers.get(container).unwrap_or(&self.fallback)
    }
}

impl FeatureProvider for ContainerFeatureProvider {
    fn feature(&self, container: &str, overrides: &GadgetOverrides) -> Arc<ContentRewriterFeature> {
        Arc::new(ContentRewriterFeature::new(
            self.defaults_for(container),
            overrides,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(include: &[&str], exclude: &[&str]) -> FeatureDefaults {
        FeatureDefaults {
            include_urls: include.iter().map(|s| s.to_string()).collect(),
            exclude_urls: exclude.iter().map(|s| s.to_string()).collect(),
            ..FeatureDefaults::default()
        }
    }

    #[test]
    fn test_match_all_and_excludes() {
        let feature = ContentRewriterFeature::new(
            &defaults(&["*"], &["tracker"]),
            &GadgetOverrides::default(),
        );
        assert!(feature.should_rewrite_url("http://a.com/x.js"));
        assert!(!feature.should_rewrite_url("http://tracker.com/x.js"));
    }

    #[test]
    fn test_empty_gadget_include_keeps_container_default() {
        let feature = ContentRewriterFeature::new(
            &defaults(&["a.com"], &[]),
            &GadgetOverrides::default(),
        );
        assert!(feature.should_rewrite_url("http://a.com/x"));
        assert!(!feature.should_rewrite_url("http://b.com/x"));
    }

    #[test]
    fn test_gadget_include_replaces_container_include() {
        let overrides = GadgetOverrides {
            include_urls: vec!["b.com".into()],
            ..Default::default()
        };
        let feature = ContentRewriterFeature::new(&defaults(&["a.com"], &[]), &overrides);
        assert!(!feature.should_rewrite_url("http://a.com/x"));
        assert!(feature.should_rewrite_url("http://b.com/x"));
    }

    #[test]
    fn test_excludes_are_unioned() {
        let overrides = GadgetOverrides {
            include_urls: vec!["*".into()],
            exclude_urls: vec!["b.com".into()],
            ..Default::default()
        };
        let feature = ContentRewriterFeature::new(&defaults(&["*"], &["a.com"]), &overrides);
        assert!(!feature.should_rewrite_url("http://a.com/x"));
        assert!(!feature.should_rewrite_url("http://b.com/x"));
        assert!(feature.should_rewrite_url("http://c.com/x"));
    }

    #[test]
    fn test_exclude_all() {
        let feature =
            ContentRewriterFeature::new(&defaults(&["*"], &["*"]), &GadgetOverrides::default());
        assert!(!feature.should_rewrite_url("http://a.com/x"));
    }

    #[test]
    fn test_tags() {
        let feature = ContentRewriterFeature::default();
        assert!(feature.should_rewrite_tag("IMG"));
        assert!(feature.should_rewrite_tag("script"));
        assert!(!feature.should_rewrite_tag("a"));

        let overrides = GadgetOverrides {
            include_tags: vec!["a".into()],
            ..Default::default()
        };
        let feature = ContentRewriterFeature::new(&FeatureDefaults::default(), &overrides);
        assert!(feature.should_rewrite_tag("a"));
        assert!(!feature.should_rewrite_tag("img"));
    }

    #[test]
    fn test_from_params() {
        let overrides = GadgetOverrides::from_params([
            ("include-urls", "a.com, b.com,"),
            ("exclude-urls", "c.com"),
            ("include-tags", "IMG,Script"),
            ("expires", "3600"),
            ("enable-split-js", "true"),
            ("unknown", "x"),
        ]);
        assert_eq!(overrides.include_urls, vec!["a.com", "b.com"]);
        assert_eq!(overrides.exclude_urls, vec!["c.com"]);
        assert_eq!(overrides.include_tags, vec!["img", "script"]);
        assert_eq!(overrides.expires, Some(Expires::Seconds(3600)));
        assert_eq!(overrides.split_js, Some(true));
    }

    #[test]
    fn test_expires_parse() {
        assert_eq!(Expires::parse("HTTP"), Some(Expires::Http));
        assert_eq!(Expires::parse("http"), Some(Expires::Http));
        assert_eq!(Expires::parse(" 60 "), Some(Expires::Seconds(60)));
        assert_eq!(Expires::parse("soon"), None);
        let max = crate::cache::MAX_TTL;
        assert_eq!(
            Expires::parse("18446744073709551615"),
            Some(Expires::Seconds(max.as_secs()))
        );
        assert_eq!(Expires::Seconds(u64::MAX).as_duration(), Some(max));
        assert_eq!(Expires::Seconds(5).as_duration(), Some(Duration::from_secs(5)));
        assert_eq!(Expires::Http.as_duration(), None);
    }

    #[test]
    fn test_overrides_win_for_scalars() {
        let overrides = GadgetOverrides {
            expires: Some(Expires::Seconds(10)),
            split_js: Some(true),
            ..Default::default()
        };
        let feature = ContentRewriterFeature::new(&FeatureDefaults::default(), &overrides);
        assert_eq!(feature.expires(), Expires::Seconds(10));
        assert!(feature.concat().split_js);
        assert!(feature.concat().enable);
    }

    #[test]
    fn test_fingerprint_tracks_settings() {
        let base = ContentRewriterFeature::default();
        assert_eq!(base.fingerprint(), ContentRewriterFeature::default().fingerprint());

        let overrides = GadgetOverrides {
            exclude_urls: vec!["x".into()],
            ..Default::default()
        };
        let changed = ContentRewriterFeature::new(&FeatureDefaults::default(), &overrides);
        assert_ne!(base.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_provider_falls_back() {
        let provider = ContainerFeatureProvider::default()
            .with_container("strict", defaults(&["only.com"], &[]));
        let strict = provider.feature("strict", &GadgetOverrides::default());
        assert!(!strict.should_rewrite_url("http://a.com/x"));
        let other = provider.feature("other", &GadgetOverrides::default());
        assert!(other.should_rewrite_url("http://a.com/x"));
    }
}
