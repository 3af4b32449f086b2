//! `lmatch completions`: shell completion scripts via clap_complete.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::{AppContext, Cli, CompletionsArgs};

const BIN_NAME: &str = "lmatch";

/// Write the completion script for `shell` into `out`.
pub fn render(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, out);
}

/// Write the completion script into `dir` under the shell's conventional
/// file name, returning the path written.
pub fn write_to_dir(shell: Shell, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    clap_complete::generate_to(shell, &mut Cli::command(), BIN_NAME, dir)
        .with_context(|| format!("Failed to write {shell} completion into {}", dir.display()))
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let dir = match args.out_dir {
        Some(dir) if !args.stdout => dir,
        _ => {
            render(args.shell, &mut io::stdout());
            return Ok(());
        }
    };

    if ctx.dry_run {
        if !ctx.quiet {
            eprintln!("DRY RUN: Would write {} completion to {}", args.shell, dir.display());
        }
        return Ok(());
    }

    let path = write_to_dir(args.shell, &dir)?;
    if !ctx.quiet {
        eprintln!("Wrote completion to {}", path.display());
    }
    Ok(())
}
