//! Local image catalog management.
//!
//! Maintains a JSON index of built images and their layer compositions.
//! Registration is the single point at which a build becomes a visible
//! image: a build that fails at any earlier step leaves no catalog entry
//! behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};
use strata_common::types::ImageId;

use crate::runconfig::RunConfig;

/// Entry in the local image catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Unique identifier for this image.
    pub id: ImageId,
    /// Human-readable tag.
    pub tag: String,
    /// Ordered list of layer digests (bottom to top), hex form.
    pub layers: Vec<String>,
    /// Default run configuration (identity + entry command).
    pub config: RunConfig,
    /// Total size of the layer archives in bytes.
    pub size_bytes: u64,
    /// Creation timestamp (ISO-8601).
    pub created_at: String,
}

/// Image catalog backed by a JSON file.
#[derive(Debug)]
pub struct ImageCatalog {
    catalog_path: PathBuf,
}

impl ImageCatalog {
    /// Opens or creates an image catalog in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog directory cannot be created.
    pub fn open(catalog_dir: &Path) -> Result<Self> {
        let catalog_path = catalog_dir.join("catalog.json");
        std::fs::create_dir_all(catalog_dir).map_err(|e| StrataError::io(catalog_dir, e))?;
        Ok(Self { catalog_path })
    }

    /// Lists all images in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<ImageEntry>> {
        if !self.catalog_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.catalog_path)
            .map_err(|e| StrataError::io(&self.catalog_path, e))?;
        let entries: Vec<ImageEntry> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    /// Finds an image by tag or id prefix.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::NotFound` if no image matches.
    pub fn find(&self, reference: &str) -> Result<ImageEntry> {
        self.list()?
            .into_iter()
            .find(|e| e.tag == reference || e.id.as_str().starts_with(reference))
            .ok_or_else(|| StrataError::NotFound {
                kind: "image",
                id: reference.to_string(),
            })
    }

    /// Registers a new image in the catalog, replacing any previous entry
    /// with the same tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or written.
    pub fn register(&self, entry: ImageEntry) -> Result<()> {
        let mut entries = self.list()?;
        entries.retain(|e| e.tag != entry.tag);
        tracing::info!(id = %entry.id, tag = %entry.tag, "registering image");
        entries.push(entry);
        self.write_entries(&entries)
    }

    /// Removes an image by ID.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::NotFound` if no image with the given ID
    /// exists.
    pub fn remove(&self, id: &ImageId) -> Result<()> {
        let mut entries = self.list()?;
        let before = entries.len();
        entries.retain(|e| e.id.as_str() != id.as_str());
        if entries.len() == before {
            return Err(StrataError::NotFound {
                kind: "image",
                id: id.to_string(),
            });
        }
        self.write_entries(&entries)?;

        // Per-image metadata (config.json) lives beside the catalog file.
        if let Some(dir) = self.catalog_path.parent() {
            let image_dir = dir.join(id.as_str());
            if image_dir.is_dir() {
                std::fs::remove_dir_all(&image_dir)
                    .map_err(|e| StrataError::io(&image_dir, e))?;
            }
        }
        Ok(())
    }

    fn write_entries(&self, entries: &[ImageEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.catalog_path, json)
            .map_err(|e| StrataError::io(&self.catalog_path, e))?;
        Ok(())
    }
}
