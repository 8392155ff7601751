//! Global configuration model for the Strata tool.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for builds and launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Base directory for Strata state and data.
    pub data_dir: PathBuf,
    /// Directory holding content-addressed layers.
    pub layer_store: PathBuf,
    /// Directory holding the image catalog.
    pub catalog_dir: PathBuf,
    /// Directory where container rootfs trees are materialized for launch.
    pub rootfs_dir: PathBuf,
}

impl StrataConfig {
    /// Builds a configuration rooted at the given data directory.
    #[must_use]
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            layer_store: data_dir.join("layers"),
            catalog_dir: data_dir.join("images"),
            rootfs_dir: data_dir.join("rootfs"),
            data_dir,
        }
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self::rooted_at(crate::constants::data_dir().clone())
    }
}
