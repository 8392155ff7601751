//! `strata build` — Build an image from a .strata recipe.

use std::path::PathBuf;

use clap::Args;
use strata_build::builder::ImageBuilder;
use strata_build::runner::{ChrootRunner, CommandRunner};
use strata_common::config::StrataConfig;
use strata_common::constants::DEFAULT_RECIPE_FILE;

use crate::output::{format_bytes, short_digest};

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the .strata recipe file.
    #[arg(default_value = DEFAULT_RECIPE_FILE)]
    pub file: PathBuf,

    /// Tag for the built image.
    #[arg(short, long)]
    pub tag: String,

    /// Build context directory.
    #[arg(short, long, default_value = ".")]
    pub context: PathBuf,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if the recipe is invalid or any build stage fails.
pub fn execute(config: &StrataConfig, args: BuildArgs) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.file).map_err(|e| {
        anyhow::anyhow!("cannot read recipe {}: {e}", args.file.display())
    })?;
    let plan = strata_recipe::load_plan(&source)?;

    let runner = ChrootRunner::new();
    if !runner.is_available() {
        anyhow::bail!(
            "building requires Linux with the `chroot` binary available\n\
             (use `strata plan` to inspect the recipe without building)"
        );
    }

    eprintln!();
    eprintln!("  {BOLD}strata build{RESET} {DIM}{}{RESET}", args.tag);
    for step in plan.describe() {
        eprintln!("    {DIM}{step}{RESET}");
    }
    eprintln!();

    let builder = ImageBuilder::new(config.clone(), Box::new(runner));
    let entry = builder.build(&plan, &args.context, &args.tag)?;

    for (index, layer) in entry.layers.iter().enumerate() {
        eprintln!("  layer {index}: {}", short_digest(layer));
    }
    eprintln!(
        "  {GREEN}built{RESET} {} ({}, id {})",
        entry.tag,
        format_bytes(entry.size_bytes),
        entry.id
    );
    Ok(())
}
