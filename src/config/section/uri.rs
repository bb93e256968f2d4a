//! `[uri]` section configuration.
//!
//! ```toml
//! [uri]
//! proxy = "http://localhost:8080/gadgets/proxy"
//! concat = "http://localhost:8080/gadgets/concat"
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UriConfig {
    pub proxy: String,
    pub concat: String,
}

impl Default for UriConfig {
    fn default() -> Self {
        Self {
            proxy: "http://localhost:8080/gadgets/proxy".to_owned(),
            concat: "http://localhost:8080/gadgets/concat".to_owned(),
        }
    }
}

impl UriConfig {
    pub const PROXY: FieldPath = FieldPath::new("uri.proxy");
    pub const CONCAT: FieldPath = FieldPath::new("uri.concat");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        validate_base(&self.proxy, Self::PROXY, diag);
        validate_base(&self.concat, Self::CONCAT, diag);
    }
}

/// Base URLs must be absolute http(s) URLs.
pub(crate) fn validate_base(value: &str, field: FieldPath, diag: &mut ConfigDiagnostics) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => diag.error(field, format!("unsupported scheme `{}`", url.scheme())),
        Err(e) => diag.error_with_hint(
            field,
            format!("invalid URL `{value}`: {e}"),
            "use an absolute URL such as \"http://host/gadgets/proxy\"",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_invalid_bases() {
        let config = test_parse_config("[uri]\nproxy = \"/relative\"\nconcat = \"ftp://h/c\"");
        let mut diag = ConfigDiagnostics::new();
        config.uri.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
