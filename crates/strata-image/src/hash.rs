//! SHA-256 content addressing and verification.

use std::io::Read;
use std::path::Path;

use sha2::{Digest as _, Sha256};
use strata_common::error::{Result, StrataError};
use strata_common::types::Digest;

/// Computes the SHA-256 digest of a file, streaming its contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Digest> {
    tracing::debug!(path = %path.display(), "computing SHA-256 digest");

    let mut file = std::fs::File::open(path).map_err(|e| StrataError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| StrataError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    finish(hasher)
}

/// Computes the SHA-256 digest of an in-memory byte slice.
///
/// # Errors
///
/// Returns an error only if the digest cannot be encoded (never in
/// practice).
pub fn hash_bytes(bytes: &[u8]) -> Result<Digest> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finish(hasher)
}

fn finish(hasher: Sha256) -> Result<Digest> {
    let raw = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in raw {
        hex.push_str(&format!("{byte:02x}"));
    }
    Digest::from_hex(hex)
}

/// Validates that a file matches the expected SHA-256 digest.
///
/// # Errors
///
/// Returns `StrataError::HashMismatch` if the digests disagree, or an I/O
/// error if the file cannot be read.
pub fn validate_hash(path: &Path, expected: &Digest) -> Result<()> {
    let actual = hash_file(path)?;
    if actual != *expected {
        return Err(StrataError::HashMismatch {
            resource: path.display().to_string(),
            expected: expected.as_hex().to_string(),
            actual: actual.as_hex().to_string(),
        });
    }
    Ok(())
}
