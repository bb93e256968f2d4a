//! `rewrite` command implementation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{RewriteArgs, Runtime};
use crate::content::MutableContent;
use crate::rewrite::ContentRewriterRegistry;

/// Rewrite one document and write the result.
pub fn run_rewrite(args: &RewriteArgs, runtime: &Runtime) -> Result<()> {
    let input = read_input(args.input.as_deref())?;
    let output = rewrite_str(args, runtime, input)?;
    write_output(args.output.as_deref(), &output)
}

pub(crate) fn rewrite_str(args: &RewriteArgs, runtime: &Runtime, input: String) -> Result<String> {
    let ctx = runtime.context(args);
    let mut content = MutableContent::new(input, Arc::clone(&runtime.parser));

    let changed = runtime
        .cached
        .rewrite(&ctx, &args.container, args.flow, &mut content)
        .with_context(|| format!("{} rewrite for `{}` failed", args.flow, args.container))?;

    crate::debug!(
        "rewrite";
        "{}/{}: {} ({} document changes)",
        args.container,
        args.flow,
        if changed { "changed" } else { "unchanged" },
        content.num_changes()
    );
    Ok(content.into_content())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        None => read_stdin(),
        Some(p) if p == Path::new("-") => read_stdin(),
        Some(p) => fs::read_to_string(p).with_context(|| format!("failed to read `{}`", p.display())),
    }
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(input)
}

fn write_output(path: Option<&Path>, output: &str) -> Result<()> {
    match path {
        Some(p) => fs::write(p, output).with_context(|| format!("failed to write `{}`", p.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
