//! `strata images` — Manage the local image catalog.

use clap::Args;
use strata_common::config::StrataConfig;
use strata_image::catalog::ImageCatalog;

use crate::output::{format_bytes, short_digest};

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// List all images (the default action).
    #[arg(short, long)]
    pub list: bool,

    /// Remove an image by tag or id prefix.
    #[arg(long, conflicts_with = "list")]
    pub remove: Option<String>,
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if catalog operations fail.
pub fn execute(config: &StrataConfig, args: ImagesArgs) -> anyhow::Result<()> {
    let catalog = ImageCatalog::open(&config.catalog_dir)?;

    if let Some(reference) = args.remove {
        let entry = catalog.find(&reference)?;
        catalog.remove(&entry.id)?;
        println!("removed {} ({})", entry.tag, entry.id);
        return Ok(());
    }

    tracing::debug!(explicit = args.list, "listing image catalog");
    println!(
        "{:<14} {:<24} {:<12} {:<10} CREATED",
        "IMAGE ID", "TAG", "TOP LAYER", "SIZE"
    );
    for entry in catalog.list()? {
        let top = entry
            .layers
            .last()
            .map_or_else(|| "-".to_string(), |hex| short_digest(hex));
        println!(
            "{:<14} {:<24} {:<12} {:<10} {}",
            entry.id.as_str(),
            entry.tag,
            top,
            format_bytes(entry.size_bytes),
            entry.created_at
        );
    }
    Ok(())
}
