//! Configuration section definitions.
//!
//! Each module corresponds to a section in `rewriter.toml`:
//!
//! | Module      | TOML Section          | Purpose                          |
//! |-------------|-----------------------|----------------------------------|
//! | `rewrite`   | `[rewrite]`           | URL/tag policy, expiry           |
//! | `concat`    | `[concat]`            | Resource concatenation           |
//! | `sanitize`  | `[sanitize]`          | Allow-lists                      |
//! | `uri`       | `[uri]`               | Proxy and concat endpoints       |
//! | `fetch`     | `[fetch]`, `[cache]`  | Fetch agent, pool, cache sizes   |
//! | `container` | `[containers.<name>]` | Per-container overrides          |

mod concat;
mod container;
mod fetch;
mod rewrite;
mod sanitize;
mod uri;

pub use concat::ConcatConfig;
pub use container::ContainerConfig;
pub use fetch::{CacheConfig, FetchConfig};
pub use rewrite::{ExpiresSetting, RewriteConfig};
pub use sanitize::SanitizeConfig;
pub use uri::UriConfig;
