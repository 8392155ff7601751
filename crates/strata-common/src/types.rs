//! Domain primitive types used across the Strata workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a built image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random image ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest used for content addressing of layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(String);

impl Digest {
    /// Creates a digest from a hex-encoded string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> crate::error::Result<Self> {
        let hex = hex.into();
        if hex.len() != crate::constants::SHA256_HEX_LENGTH
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(crate::error::StrataError::Recipe {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex))
    }

    /// Returns the hex-encoded digest string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Phase of the build lifecycle, in strict happens-after order.
///
/// Every phase must complete before the next begins; the first failure
/// aborts the whole build with no partial image produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStage {
    /// Base rootfs is being materialized.
    Base,
    /// Working directory is being prepared.
    Workdir,
    /// System toolchain packages are being installed.
    Toolchain,
    /// Manifest dependencies are being installed.
    Dependencies,
    /// Application source tree is being copied.
    Source,
    /// Restricted execution account is being created.
    Account,
    /// Layers are being archived and the image registered.
    Finalize,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Workdir => write!(f, "workdir"),
            Self::Toolchain => write!(f, "toolchain"),
            Self::Dependencies => write!(f, "dependencies"),
            Self::Source => write!(f, "source"),
            Self::Account => write!(f, "account"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}
