//! CLI command definitions and dispatch.

pub mod build;
pub mod images;
pub mod plan;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_common::config::StrataConfig;

/// Strata — recipe-driven image builder and privilege-dropping launcher.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Base directory for layers, images, and rootfs trees.
    #[arg(long, global = true, env = "STRATA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> StrataConfig {
        self.data_dir.as_ref().map_or_else(StrataConfig::default, |dir| {
            StrataConfig::rooted_at(dir.clone())
        })
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an image from a .strata recipe.
    Build(build::BuildArgs),
    /// Show the build steps a recipe would run, without building.
    Plan(plan::PlanArgs),
    /// Launch an image under its restricted account.
    Run(run::RunArgs),
    /// Manage the local image catalog.
    Images(images::ImagesArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    match cli.command {
        Command::Build(args) => build::execute(&config, args),
        Command::Plan(args) => plan::execute(args),
        Command::Run(args) => run::execute(&config, args),
        Command::Images(args) => images::execute(&config, args),
    }
}
