//! Content-addressed local layer store.
//!
//! Layer archives live under `<root>/<digest>.tar.gz`. Writes go through
//! a temporary file and a rename, so a crashed build never leaves a
//! half-written archive under a valid digest name.

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};
use strata_common::types::Digest;

/// Manages local storage of content-addressed layer archives.
#[derive(Debug)]
pub struct LayerStore {
    /// Root directory for all stored layers.
    root: PathBuf,
}

impl LayerStore {
    /// Opens or initializes the layer store at the given root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StrataError::io(&root, e))?;
        tracing::info!(path = %root.display(), "opening layer store");
        Ok(Self { root })
    }

    /// Returns the path of a layer archive given its digest.
    #[must_use]
    pub fn layer_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(format!("{}.tar.gz", digest.as_hex()))
    }

    /// Checks whether a layer exists in the store.
    #[must_use]
    pub fn has_layer(&self, digest: &Digest) -> bool {
        self.layer_path(digest).exists()
    }

    /// Moves a finished archive into the store under its digest.
    ///
    /// The source must already hash to `digest`; this is verified before
    /// the rename.
    ///
    /// # Errors
    ///
    /// Returns a hash-mismatch error if the archive does not match the
    /// digest, or an I/O error if the rename fails.
    pub fn put(&self, archive: &Path, digest: &Digest) -> Result<PathBuf> {
        crate::hash::validate_hash(archive, digest)?;
        let dest = self.layer_path(digest);
        if dest.exists() {
            // Content-addressed: an existing entry is byte-identical.
            return Ok(dest);
        }
        std::fs::rename(archive, &dest).or_else(|_| {
            // Cross-device fallback.
            std::fs::copy(archive, &dest)
                .map(|_| ())
                .and_then(|()| std::fs::remove_file(archive))
                .map_err(|e| StrataError::io(archive, e))
        })?;
        tracing::debug!(digest = %digest, "layer stored");
        Ok(dest)
    }

    /// Returns the path of a stored layer, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::NotFound` if the layer is not in the store.
    pub fn get(&self, digest: &Digest) -> Result<PathBuf> {
        let path = self.layer_path(digest);
        if !path.exists() {
            return Err(StrataError::NotFound {
                kind: "layer",
                id: digest.to_string(),
            });
        }
        Ok(path)
    }

    /// Returns the root storage path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
