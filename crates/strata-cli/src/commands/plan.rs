//! `strata plan` — Show the build steps a recipe would run.

use std::path::PathBuf;

use clap::Args;
use strata_common::constants::DEFAULT_RECIPE_FILE;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the .strata recipe file.
    #[arg(default_value = DEFAULT_RECIPE_FILE)]
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if the recipe cannot be read or fails validation.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.file).map_err(|e| {
        anyhow::anyhow!("cannot read recipe {}: {e}", args.file.display())
    })?;
    let plan = strata_recipe::load_plan(&source)?;

    println!("steps for {}:", args.file.display());
    for step in plan.describe() {
        println!("  {step}");
    }
    Ok(())
}
