//! `strata run` — Launch an image under its restricted account.

use clap::Args;
use strata_common::config::StrataConfig;
use strata_common::error::StrataError;
use strata_common::types::Digest;
use strata_image::catalog::{ImageCatalog, ImageEntry};
use strata_image::layer::extract_layer;
use strata_image::store::LayerStore;
use strata_launch::{Launcher, Privileged};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image tag or id prefix.
    pub image: String,

    /// Directory to materialize the rootfs under (defaults to the data
    /// directory's rootfs area).
    #[arg(long)]
    pub rootfs_dir: Option<std::path::PathBuf>,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Executes the `run` command.
///
/// Materializes the image rootfs, drops privileges, runs the entry
/// command, and exits with the child's exit code.
///
/// # Errors
///
/// Returns an error if the image is missing, the rootfs cannot be
/// materialized, or the launch protocol fails before execution.
pub fn execute(config: &StrataConfig, args: RunArgs) -> anyhow::Result<()> {
    let catalog = ImageCatalog::open(&config.catalog_dir)?;
    let entry = catalog.find(&args.image)?;

    eprintln!();
    eprintln!(
        "  {BOLD}strata run{RESET} {} {DIM}as {} (uid {}){RESET}",
        entry.tag, entry.config.user, entry.config.uid
    );
    eprintln!();

    let rootfs_base = args
        .rootfs_dir
        .clone()
        .unwrap_or_else(|| config.rootfs_dir.clone());
    let rootfs = materialize(config, &rootfs_base, &entry)?;

    // Keep the parent alive through Ctrl+C so the child's exit code is
    // still reaped and reported.
    ctrlc::set_handler(|| {})?;

    let launcher = Launcher::<Privileged>::new(&rootfs, entry.config.clone())?;
    let code = launcher.drop_privileges()?.exec()?;
    std::process::exit(code);
}

/// Extracts the image's layers, bottom to top, into a fresh rootfs.
fn materialize(
    config: &StrataConfig,
    rootfs_base: &std::path::Path,
    entry: &ImageEntry,
) -> Result<std::path::PathBuf, StrataError> {
    let store = LayerStore::open(&config.layer_store)?;
    let rootfs = rootfs_base.join(entry.id.as_str());
    if rootfs.exists() {
        std::fs::remove_dir_all(&rootfs).map_err(|e| StrataError::io(&rootfs, e))?;
    }
    std::fs::create_dir_all(&rootfs).map_err(|e| StrataError::io(&rootfs, e))?;

    for hex in &entry.layers {
        let digest = Digest::from_hex(hex.clone())?;
        let archive = store.get(&digest)?;
        let _ = extract_layer(&archive, &rootfs)?;
    }
    tracing::info!(id = %entry.id, rootfs = %rootfs.display(), "rootfs materialized");
    Ok(rootfs)
}
