//! gadget-rewriter - rewrite gadget markup from the command line.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use gadget_rewriter::cli::{self, Cli, Commands, Runtime};
use gadget_rewriter::config::RewriterConfig;
use gadget_rewriter::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = RewriterConfig::load(cli.config.as_deref())?;
    let runtime = Runtime::new(config)?;

    let result = match &cli.command {
        Commands::Rewrite { args } => cli::rewrite::run_rewrite(args, &runtime),
        Commands::Pipelines { json } => cli::inspect::list_pipelines(&runtime, *json),
        Commands::Check => cli::inspect::check_config(&runtime),
    };

    runtime.shutdown();
    result
}
