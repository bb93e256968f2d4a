//! `[containers.<name>]` per-container overrides.
//!
//! Every field is optional; unset fields inherit from `[rewrite]` and
//! `[uri]`.
//!
//! ```toml
//! [containers.acme]
//! exclude_urls = ["ads.example.com"]
//! expires = 3600
//! proxy = "http://acme.example.com/proxy"
//! ```

use serde::{Deserialize, Serialize};

use super::rewrite::{ExpiresSetting, validate_expires};
use super::uri::validate_base;
use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub include_urls: Option<Vec<String>>,
    pub exclude_urls: Option<Vec<String>>,
    pub include_tags: Option<Vec<String>>,
    pub expires: Option<ExpiresSetting>,
    pub proxy: Option<String>,
    pub concat: Option<String>,
}

impl ContainerConfig {
    // Field paths are shared by every container entry
    pub const EXPIRES: FieldPath = FieldPath::new("containers.*.expires");
    pub const PROXY: FieldPath = FieldPath::new("containers.*.proxy");
    pub const CONCAT: FieldPath = FieldPath::new("containers.*.concat");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(expires) = &self.expires {
            validate_expires(expires, Self::EXPIRES, diag);
        }
        if let Some(proxy) = &self.proxy {
            validate_base(proxy, Self::PROXY, diag);
        }
        if let Some(concat) = &self.concat {
            validate_base(concat, Self::CONCAT, diag);
        }
    }
}
