//! Source-tree materialization into the staging rootfs.
//!
//! The working directory is prepared first and must not collide with
//! pre-existing base content; the copy itself runs while the build is
//! still privileged, so ownership of the copied tree is the builder's.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};

/// Creates the image working directory inside the rootfs.
///
/// A pre-existing non-empty directory is a collision: the base already
/// claims the path and copying over it would silently merge trees.
///
/// # Errors
///
/// Returns a collision error if the directory exists and is non-empty, or
/// an I/O error if it cannot be created.
pub fn prepare_workdir(rootfs: &Path, workdir: &str) -> Result<PathBuf> {
    let dir = rootfs.join(workdir.trim_start_matches('/'));
    if dir.exists() {
        let mut entries = std::fs::read_dir(&dir).map_err(|e| StrataError::io(&dir, e))?;
        if entries.next().is_some() {
            return Err(StrataError::Collision { path: dir });
        }
    } else {
        std::fs::create_dir_all(&dir).map_err(|e| StrataError::io(&dir, e))?;
    }
    tracing::debug!(workdir = %dir.display(), "working directory prepared");
    Ok(dir)
}

/// Copies the build context into the rootfs working directory.
///
/// `source_rel` selects what to copy relative to the context (`"."` for
/// the whole context). Top-level entries named in `exclude` (the recipe
/// file, the local data directory) are skipped; everything else is copied
/// verbatim.
///
/// # Errors
///
/// Returns an error if the source path is missing or any entry cannot be
/// copied.
pub fn copy_context(
    context: &Path,
    source_rel: &str,
    workdir_in_rootfs: &Path,
    exclude: &[OsString],
) -> Result<u64> {
    let source = if source_rel == "." {
        context.to_path_buf()
    } else {
        context.join(source_rel)
    };
    if !source.exists() {
        return Err(StrataError::NotFound {
            kind: "source path",
            id: source.display().to_string(),
        });
    }

    let copied = if source.is_dir() {
        copy_dir(&source, workdir_in_rootfs, exclude, true)?
    } else {
        let dest = workdir_in_rootfs.join(source.file_name().unwrap_or_default());
        let _ = std::fs::copy(&source, &dest).map_err(|e| StrataError::io(&source, e))?;
        1
    };

    tracing::info!(files = copied, dest = %workdir_in_rootfs.display(), "source tree copied");
    Ok(copied)
}

fn copy_dir(from: &Path, to: &Path, exclude: &[OsString], top_level: bool) -> Result<u64> {
    std::fs::create_dir_all(to).map_err(|e| StrataError::io(to, e))?;
    let mut copied = 0;
    let read_dir = std::fs::read_dir(from).map_err(|e| StrataError::io(from, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| StrataError::io(from, e))?;
        if top_level && exclude.contains(&entry.file_name()) {
            continue;
        }
        let src = entry.path();
        let dest = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| StrataError::io(&src, e))?;
        if file_type.is_dir() {
            copied += copy_dir(&src, &dest, exclude, false)?;
        } else if !file_type.is_symlink() {
            let _ = std::fs::copy(&src, &dest).map_err(|e| StrataError::io(&src, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}
