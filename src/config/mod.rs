//! Rewriter configuration management for `rewriter.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── rewrite    # [rewrite]
//! │   ├── concat     # [concat]
//! │   ├── sanitize   # [sanitize]
//! │   ├── uri        # [uri]
//! │   ├── fetch      # [fetch], [cache]
//! │   └── container  # [containers.<name>]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # RewriterConfig (this file)
//! ```
//!
//! Every section is optional; an empty file yields the built-in defaults.
//! Container entries override `[rewrite]` and `[uri]` field by field.

pub mod section;
pub mod types;
mod util;

pub use util::find_config_file;

pub use section::{
    CacheConfig, ConcatConfig, ContainerConfig, ExpiresSetting, FetchConfig, RewriteConfig,
    SanitizeConfig, UriConfig,
};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, Severity};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::log;
use crate::policy::{ContainerFeatureProvider, FeatureDefaults};
use crate::uri::UriBases;

/// Default config file name, searched upward from the working directory.
pub const CONFIG_FILE: &str = "rewriter.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing rewriter.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriterConfig {
    /// Absolute path to the config file, empty for built-in defaults
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub rewrite: RewriteConfig,

    #[serde(default)]
    pub concat: ConcatConfig,

    #[serde(default)]
    pub sanitize: SanitizeConfig,

    #[serde(default)]
    pub uri: UriConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-container overrides keyed by container name
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerConfig>,
}

impl RewriterConfig {
    /// Load and validate configuration.
    ///
    /// An explicit path must exist. Without one, `rewriter.toml` is searched
    /// upward from cwd and the defaults are used when none is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(Path::new(CONFIG_FILE)),
        };

        let mut config = match path {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Trim and lowercase tag names so lookups are case-insensitive.
    fn normalize(&mut self) {
        fn lower(tags: &mut [String]) {
            for tag in tags {
                *tag = tag.trim().to_ascii_lowercase();
            }
        }
        lower(&mut self.rewrite.include_tags);
        for container in self.containers.values_mut() {
            if let Some(tags) = container.include_tags.as_mut() {
                lower(tags);
            }
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let diag = self.diagnostics();
        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    fn diagnostics(&self) -> ConfigDiagnostics {
        let mut diag = ConfigDiagnostics::new();
        self.rewrite.validate(&mut diag);
        self.concat.validate(&mut diag);
        self.sanitize.validate(&mut diag);
        self.uri.validate(&mut diag);
        self.fetch.validate(&mut diag);
        self.cache.validate(&mut diag);
        for container in self.containers.values() {
            container.validate(&mut diag);
        }
        diag
    }

    // ========================================================================
    // conversions
    // ========================================================================

    /// Feature defaults for `container`, with its overrides applied.
    pub fn feature_defaults(&self, container: Option<&ContainerConfig>) -> FeatureDefaults {
        fn pick(own: Option<&Vec<String>>, fallback: &[String]) -> Vec<String> {
            own.map_or_else(|| fallback.to_vec(), Clone::clone)
        }

        let rewrite = &self.rewrite;
        let expires = container
            .and_then(|c| c.expires.as_ref())
            .unwrap_or(&rewrite.expires);

        FeatureDefaults {
            include_urls: pick(container.and_then(|c| c.include_urls.as_ref()), &rewrite.include_urls),
            exclude_urls: pick(container.and_then(|c| c.exclude_urls.as_ref()), &rewrite.exclude_urls),
            include_tags: pick(container.and_then(|c| c.include_tags.as_ref()), &rewrite.include_tags),
            // Validation rejects unresolvable values
            expires: expires.resolve().unwrap_or_default(),
            concat: self.concat.policy(),
            sanitize: Arc::new(self.sanitize.policy()),
        }
    }

    pub fn feature_provider(&self) -> ContainerFeatureProvider {
        self.containers.iter().fold(
            ContainerFeatureProvider::new(self.feature_defaults(None)),
            |provider, (name, container)| {
                provider.with_container(name, self.feature_defaults(Some(container)))
            },
        )
    }

    pub fn proxy_bases(&self) -> Result<UriBases> {
        self.bases(&self.uri.proxy, |c| c.proxy.as_deref())
    }

    pub fn concat_bases(&self) -> Result<UriBases> {
        self.bases(&self.uri.concat, |c| c.concat.as_deref())
    }

    fn bases(
        &self,
        fallback: &str,
        own: impl Fn(&ContainerConfig) -> Option<&str>,
    ) -> Result<UriBases> {
        let parse = |value: &str| {
            Url::parse(value).with_context(|| format!("invalid base URL `{value}`"))
        };
        let mut bases = UriBases::new(parse(fallback)?);
        for (name, container) in &self.containers {
            if let Some(base) = own(container) {
                bases = bases.with_container(name, parse(base)?);
            }
        }
        Ok(bases)
    }

    /// Results living shorter than this are not cached.
    pub fn min_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rewrite.min_cache_ttl)
    }

    /// Cache lifetime when nothing else decides.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.fetch.default_ttl)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> RewriterConfig {
    let (mut parsed, ignored) = RewriterConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed.normalize();
    parsed
}

// ============================================================================
// tests
// ============================================================================
