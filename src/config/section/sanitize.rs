//! `[sanitize]` section configuration.
//!
//! Lists replace the built-in allow-lists entirely.
//!
//! ```toml
//! [sanitize]
//! allowed_tags = ["a", "b", "p", "img"]
//! allowed_attributes = ["href", "src", "title"]
//! allowed_schemes = ["http", "https"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::policy::{
    DEFAULT_ALLOWED_ATTRIBUTES, DEFAULT_ALLOWED_SCHEMES, DEFAULT_ALLOWED_TAGS, SanitizePolicy,
};

/// Schemes that execute script when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript", "vbscript", "livescript"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    pub allowed_tags: Vec<String>,
    pub allowed_attributes: Vec<String>,
    pub allowed_schemes: Vec<String>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            allowed_tags: owned(DEFAULT_ALLOWED_TAGS),
            allowed_attributes: owned(DEFAULT_ALLOWED_ATTRIBUTES),
            allowed_schemes: owned(DEFAULT_ALLOWED_SCHEMES),
        }
    }
}

impl SanitizeConfig {
    pub const ALLOWED_TAGS: FieldPath = FieldPath::new("sanitize.allowed_tags");
    pub const ALLOWED_ATTRIBUTES: FieldPath = FieldPath::new("sanitize.allowed_attributes");
    pub const ALLOWED_SCHEMES: FieldPath = FieldPath::new("sanitize.allowed_schemes");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for scheme in &self.allowed_schemes {
            if SCRIPT_SCHEMES.contains(&scheme.trim().to_ascii_lowercase().as_str()) {
                diag.error_with_hint(
                    Self::ALLOWED_SCHEMES,
                    format!("`{scheme}` runs script"),
                    "remove it from the list",
                );
            }
        }
        if self.allowed_tags.iter().any(|t| t.eq_ignore_ascii_case("script")) {
            diag.warn(Self::ALLOWED_TAGS, "allowing <script> defeats sanitizing");
        }
        if self
            .allowed_attributes
            .iter()
            .any(|a| a.trim().to_ascii_lowercase().starts_with("on"))
        {
            diag.warn(Self::ALLOWED_ATTRIBUTES, "event handler attributes are allowed");
        }
    }

    pub fn policy(&self) -> SanitizePolicy {
        SanitizePolicy::new(
            &self.allowed_tags,
            &self.allowed_attributes,
            &self.allowed_schemes,
        )
    }
}
