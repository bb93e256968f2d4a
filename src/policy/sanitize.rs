//! Allow-lists applied by the sanitizing visitor.

use rustc_hash::FxHashSet;

/// Elements kept by default. `html`, `head` and `body` are structural and
/// always kept regardless of this list.
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "address", "article", "aside", "b", "bdi", "bdo", "big",
    "blockquote", "br", "caption", "center", "cite", "code", "col", "colgroup", "dd", "del",
    "details", "dfn", "div", "dl", "dt", "em", "figcaption", "figure", "font", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img", "ins", "kbd", "label", "li",
    "link", "ol", "p", "pre", "q", "s", "samp", "section", "small", "span", "strike", "strong",
    "style", "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead", "title",
    "tr", "tt", "u", "ul", "var",
];

pub const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &[
    "align", "alt", "bgcolor", "border", "cellpadding", "cellspacing", "class", "color",
    "colspan", "dir", "face", "height", "href", "hspace", "id", "lang", "media", "name", "rel",
    "rowspan", "size", "span", "src", "style", "summary", "target", "title", "type", "valign",
    "vspace", "width",
];

pub const DEFAULT_ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Attributes whose value is a URL and must pass the scheme check.
pub const URL_ATTRIBUTES: &[&str] = &[
    "action", "background", "cite", "codebase", "data", "dynsrc", "formaction", "href",
    "longdesc", "lowsrc", "poster", "src", "usemap",
];

/// Tag, attribute and URL-scheme allow-lists. Names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    allowed_tags: FxHashSet<String>,
    allowed_attributes: FxHashSet<String>,
    allowed_schemes: FxHashSet<String>,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_TAGS.iter().copied(),
            DEFAULT_ALLOWED_ATTRIBUTES.iter().copied(),
            DEFAULT_ALLOWED_SCHEMES.iter().copied(),
        )
    }
}

impl SanitizePolicy {
    pub fn new<T, A, S>(tags: T, attributes: A, schemes: S) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        fn lower<I>(items: I) -> FxHashSet<String>
        where
            I: IntoIterator,
            I::Item: AsRef<str>,
        {
            items
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        }

        Self {
            allowed_tags: lower(tags),
            allowed_attributes: lower(attributes),
            allowed_schemes: lower(schemes),
        }
    }

    #[inline]
    pub fn is_allowed_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(&tag.to_ascii_lowercase())
    }

    #[inline]
    pub fn is_allowed_attribute(&self, name: &str) -> bool {
        self.allowed_attributes.contains(&name.to_ascii_lowercase())
    }

    #[inline]
    pub fn is_allowed_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes.contains(&scheme.to_ascii_lowercase())
    }

    /// Whether the attribute carries a URL.
    #[inline]
    pub fn is_url_attribute(name: &str) -> bool {
        URL_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str())
    }

    /// Sorted lists, for fingerprinting and display.
    pub fn sorted_tags(&self) -> Vec<&str> {
        sorted(&self.allowed_tags)
    }

    pub fn sorted_attributes(&self) -> Vec<&str> {
        sorted(&self.allowed_attributes)
    }

    pub fn sorted_schemes(&self) -> Vec<&str> {
        sorted(&self.allowed_schemes)
    }
}

fn sorted(set: &FxHashSet<String>) -> Vec<&str> {
    let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}
