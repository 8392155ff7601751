//! Base-environment source resolution.
//!
//! Supports `file://` (local rootfs directory) and `tar://` (local
//! archive) sources. Local-first by design: a base is an immutable,
//! versioned reference selected once per build and never mutated.

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};

/// Supported base-environment source protocols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseSource {
    /// Local rootfs directory (`file:///path/to/rootfs`).
    Dir(PathBuf),
    /// Local tar archive (`tar:///path/to/base.tar.gz`).
    Archive(PathBuf),
}

/// Resolves a base source URI into a [`BaseSource`].
///
/// # Errors
///
/// Returns an error if the URI scheme is unsupported or the path does not
/// exist.
pub fn resolve_base(uri: &str) -> Result<BaseSource> {
    if let Some(path_str) = uri.strip_prefix("file://") {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            return Err(StrataError::NotFound {
                kind: "base rootfs directory",
                id: path_str.to_string(),
            });
        }
        tracing::info!(path = %path.display(), "resolved file:// base");
        Ok(BaseSource::Dir(path))
    } else if let Some(path_str) = uri.strip_prefix("tar://") {
        let path = PathBuf::from(path_str);
        if !path.is_file() {
            return Err(StrataError::NotFound {
                kind: "base archive",
                id: path_str.to_string(),
            });
        }
        tracing::info!(path = %path.display(), "resolved tar:// base");
        Ok(BaseSource::Archive(path))
    } else {
        Err(StrataError::Recipe {
            message: format!("unsupported base source URI scheme: {uri}"),
        })
    }
}

/// Materializes a resolved base into the staging rootfs directory and
/// returns the base layer.
///
/// The layer archive is always left at `staged` so the caller can move it
/// into the content-addressed store: directory sources are archived
/// deterministically, archive sources are copied verbatim (the original
/// reference is never consumed).
///
/// # Errors
///
/// Returns an error if copying, archiving, or extraction fails.
pub fn materialize_base(
    source: &BaseSource,
    rootfs: &Path,
    staged: &Path,
) -> Result<crate::layer::Layer> {
    std::fs::create_dir_all(rootfs).map_err(|e| StrataError::io(rootfs, e))?;
    match source {
        BaseSource::Dir(dir) => {
            copy_tree(dir, rootfs)?;
            crate::layer::archive_dir(rootfs, staged)
        }
        BaseSource::Archive(archive) => {
            let _ = std::fs::copy(archive, staged).map_err(|e| StrataError::io(archive, e))?;
            crate::layer::extract_layer(staged, rootfs)
        }
    }
}

/// Recursively copies a directory tree, preserving symlinks.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).map_err(|e| StrataError::io(to, e))?;
    let read_dir = std::fs::read_dir(from).map_err(|e| StrataError::io(from, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| StrataError::io(from, e))?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| StrataError::io(&src, e))?;
        if file_type.is_symlink() {
            copy_symlink(&src, &dest)?;
        } else if file_type.is_dir() {
            copy_tree(&src, &dest)?;
        } else {
            let _ = std::fs::copy(&src, &dest).map_err(|e| StrataError::io(&src, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<()> {
    let target = std::fs::read_link(src).map_err(|e| StrataError::io(src, e))?;
    std::os::unix::fs::symlink(target, dest).map_err(|e| StrataError::io(dest, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _dest: &Path) -> Result<()> {
    Err(StrataError::Recipe {
        message: format!("symlink in base tree unsupported on this platform: {}", src.display()),
    })
}
