//! Command-line interface module.
//!
//! | Module     | Purpose                                       |
//! |------------|-----------------------------------------------|
//! | `args`     | clap definitions                              |
//! | `runtime`  | Services, registries and policy from config   |
//! | `rewrite`  | `rewrite` command                             |
//! | `inspect`  | `pipelines` and `check` commands              |

mod args;
pub mod inspect;
pub mod rewrite;
pub mod runtime;

pub use args::{Cli, Commands, RewriteArgs};
pub use runtime::Runtime;
