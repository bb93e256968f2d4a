//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

use crate::rewrite::{DEFAULT_CONTAINER, Flow};

/// Gadget content rewriter CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: rewriter.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rewrite one document through a pipeline
    #[command(visible_alias = "r")]
    Rewrite {
        #[command(flatten)]
        args: RewriteArgs,
    },

    /// List registered pipelines
    #[command(visible_alias = "p")]
    Pipelines {
        /// Print as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate the config file and print the effective settings
    Check,
}

/// Rewrite command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct RewriteArgs {
    /// Input file. Use `-` or omit to read stdin.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Container the content is rendered for
    #[arg(short, long, default_value = DEFAULT_CONTAINER)]
    pub container: String,

    /// Pipeline flow
    #[arg(short, long, value_enum, default_value_t = Flow::Default)]
    pub flow: Flow,

    /// Gadget definition URL; relative references resolve against it
    #[arg(short, long, value_hint = clap::ValueHint::Url)]
    pub gadget: Option<Url>,

    /// Content-rewrite feature param as `name=value`, e.g. `expires=3600`
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Strip unsafe markup
    #[arg(short, long)]
    pub sanitize: bool,

    /// Mark generated URLs as debug
    #[arg(long)]
    pub debug: bool,

    /// Mark generated URLs as uncacheable
    #[arg(long)]
    pub nocache: bool,

    /// Bypass the rewrite result cache
    #[arg(long)]
    pub ignore_cache: bool,

    /// Explicit lifetime for rewritten resources
    #[arg(long, value_name = "SECONDS")]
    pub refresh: Option<u64>,

    /// Write output to file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty param name in `{raw}`"));
    }
    Ok((name.to_owned(), value.to_owned()))
}
