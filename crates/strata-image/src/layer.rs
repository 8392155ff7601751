//! Filesystem layer archiving and extraction.
//!
//! Each image is composed of ordered layers, content-addressed by their
//! SHA-256 digest. Archiving is deterministic: entries are appended in
//! sorted path order with zeroed timestamps and ownership, so building
//! twice from identical inputs yields byte-identical archives and
//! therefore identical digests.

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};
use strata_common::types::Digest;

/// A single filesystem layer in an image.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Content-addressed digest of this layer archive.
    pub digest: Digest,
    /// Size of the layer archive in bytes.
    pub size_bytes: u64,
}

/// Archives a directory tree into a deterministic gzip-compressed tar at
/// `dest`.
///
/// Entry metadata is normalized: mtime 0, uid/gid 0, mode `0o755` for
/// directories and executables, `0o644` otherwise. Symlinks are preserved.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or the archive cannot be
/// written.
pub fn archive_dir(dir: &Path, dest: &Path) -> Result<Layer> {
    tracing::info!(dir = %dir.display(), dest = %dest.display(), "archiving layer");

    let mut entries = Vec::new();
    collect_entries(dir, dir, &mut entries)?;
    entries.sort();

    let file = std::fs::File::create(dest).map_err(|e| StrataError::io(dest, e))?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for relative in &entries {
        append_entry(&mut builder, dir, relative)?;
    }

    let encoder = builder.into_inner().map_err(|e| StrataError::io(dest, e))?;
    let file = encoder.finish().map_err(|e| StrataError::io(dest, e))?;
    let size_bytes = file
        .metadata()
        .map_err(|e| StrataError::io(dest, e))?
        .len();
    drop(file);

    let digest = crate::hash::hash_file(dest)?;
    tracing::info!(digest = %digest, size = size_bytes, "layer archived");

    Ok(Layer { digest, size_bytes })
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| StrataError::io(dir, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| StrataError::io(dir, e))?;
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|_| StrataError::NotFound {
                kind: "layer entry",
                id: path.display().to_string(),
            })?
            .to_path_buf();
        out.push(relative);
        let file_type = entry.file_type().map_err(|e| StrataError::io(&path, e))?;
        if file_type.is_dir() && !file_type.is_symlink() {
            collect_entries(root, &path, out)?;
        }
    }
    Ok(())
}

fn append_entry<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    root: &Path,
    relative: &Path,
) -> Result<()> {
    let path = root.join(relative);
    let metadata = std::fs::symlink_metadata(&path).map_err(|e| StrataError::io(&path, e))?;

    let mut header = tar::Header::new_gnu();
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(&path).map_err(|e| StrataError::io(&path, e))?;
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, relative, &target)
            .map_err(|e| StrataError::io(&path, e))?;
    } else if metadata.is_dir() {
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, relative, std::io::empty())
            .map_err(|e| StrataError::io(&path, e))?;
    } else {
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(if is_executable(&metadata) { 0o755 } else { 0o644 });
        header.set_cksum();
        let file = std::fs::File::open(&path).map_err(|e| StrataError::io(&path, e))?;
        builder
            .append_data(&mut header, relative, file)
            .map_err(|e| StrataError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
const fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}

/// Extracts a layer archive to the target directory.
///
/// Supports both plain `.tar` and gzip-compressed `.tar.gz` / `.tgz`
/// archives.
///
/// # Errors
///
/// Returns an error if extraction or digest computation fails.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<Layer> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );

    std::fs::create_dir_all(target).map_err(|e| StrataError::io(target, e))?;

    let file = std::fs::File::open(archive_path).map_err(|e| StrataError::io(archive_path, e))?;
    let metadata = file
        .metadata()
        .map_err(|e| StrataError::io(archive_path, e))?;
    let size_bytes = metadata.len();

    if is_gzip_archive(archive_path) {
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        archive
            .unpack(target)
            .map_err(|e| StrataError::io(target, e))?;
    } else {
        let mut archive = tar::Archive::new(file);
        archive
            .unpack(target)
            .map_err(|e| StrataError::io(target, e))?;
    }

    let digest = crate::hash::hash_file(archive_path)?;
    tracing::info!(digest = %digest, size = size_bytes, "layer extracted");

    Ok(Layer { digest, size_bytes })
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate_tree(root: &Path) {
        std::fs::create_dir_all(root.join("app/pkg")).expect("mkdir");
        std::fs::write(root.join("app/main.py"), b"print('ready')\n").expect("write");
        std::fs::write(root.join("app/pkg/util.py"), b"VALUE = 1\n").expect("write");
    }

    #[test]
    fn archive_then_extract_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = dir.path().join("tree");
        populate_tree(&tree);

        let archive = dir.path().join("layer.tar.gz");
        let layer = archive_dir(&tree, &archive).expect("archive");
        assert!(layer.size_bytes > 0);

        let out = dir.path().join("out");
        let extracted = extract_layer(&archive, &out).expect("extract");
        assert_eq!(extracted.digest, layer.digest);

        let content = std::fs::read_to_string(out.join("app/main.py")).expect("read");
        assert_eq!(content, "print('ready')\n");
        assert!(out.join("app/pkg/util.py").exists());
    }

    #[test]
    fn archive_is_deterministic_across_rebuilds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = dir.path().join("tree");
        populate_tree(&tree);

        let first = archive_dir(&tree, &dir.path().join("a.tar.gz")).expect("archive");

        // Touch the tree so filesystem timestamps differ, then rebuild.
        let other = tempfile::tempdir().expect("tempdir");
        let tree2 = other.path().join("tree");
        populate_tree(&tree2);
        let second = archive_dir(&tree2, &other.path().join("b.tar.gz")).expect("archive");

        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn archive_digest_changes_with_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = dir.path().join("tree");
        populate_tree(&tree);
        let first = archive_dir(&tree, &dir.path().join("a.tar.gz")).expect("archive");

        std::fs::write(tree.join("app/main.py"), b"print('changed')\n").expect("write");
        let second = archive_dir(&tree, &dir.path().join("b.tar.gz")).expect("archive");

        assert_ne!(first.digest, second.digest);
    }

    #[test]
    fn extract_nonexistent_archive_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = extract_layer(&dir.path().join("missing.tar"), &dir.path().join("out"));
        assert!(result.is_err());
    }

    #[test]
    fn archive_empty_dir_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = dir.path().join("empty");
        std::fs::create_dir_all(&tree).expect("mkdir");
        let layer = archive_dir(&tree, &dir.path().join("e.tar.gz")).expect("archive");
        assert!(layer.size_bytes > 0);
    }

    #[test]
    fn is_gzip_archive_detects_extensions() {
        assert!(is_gzip_archive(Path::new("layer.tar.gz")));
        assert!(is_gzip_archive(Path::new("layer.tgz")));
        assert!(!is_gzip_archive(Path::new("layer.tar")));
        assert!(!is_gzip_archive(Path::new("layer.zip")));
    }
}
