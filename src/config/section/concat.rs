//! `[concat]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [concat]
//! enable = true
//! split_js = false            # One eval() stub per original script
//! single_resource = false     # Concat every resource on its own
//! max_url_length = 2048       # Longer runs are split
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::policy::{ConcatPolicy, DEFAULT_MAX_URL_LENGTH};

/// Shortest URL budget that still leaves room for a resource.
const MIN_URL_LENGTH: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatConfig {
    pub enable: bool,
    pub split_js: bool,
    pub single_resource: bool,
    pub max_url_length: usize,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            enable: true,
            split_js: false,
            single_resource: false,
            max_url_length: DEFAULT_MAX_URL_LENGTH,
        }
    }
}

impl ConcatConfig {
    pub const MAX_URL_LENGTH: FieldPath = FieldPath::new("concat.max_url_length");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_url_length < MIN_URL_LENGTH {
            diag.error_with_hint(
                Self::MAX_URL_LENGTH,
                format!("{} is too short for a concat URL", self.max_url_length),
                format!("use at least {MIN_URL_LENGTH}"),
            );
        }
    }

    pub fn policy(&self) -> ConcatPolicy {
        ConcatPolicy {
            enable: self.enable,
            split_js: self.split_js,
            single_resource: self.single_resource,
            max_url_length: self.max_url_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_policy() {
        let config = test_parse_config("[concat]\nsplit_js = true\nmax_url_length = 1024");
        let policy = config.concat.policy();
        assert!(policy.enable);
        assert!(policy.split_js);
        assert_eq!(policy.max_url_length, 1024);
    }

    #[test]
    fn test_short_budget_rejected() {
        let config = test_parse_config("[concat]\nmax_url_length = 10");
        let mut diag = ConfigDiagnostics::new();
        config.concat.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
