//! Unified error types for the Strata workspace.
//!
//! The variants mirror the failure taxonomy of the build/launch lifecycle:
//! everything here is fatal — no variant is retried or downgraded to a
//! warning anywhere in the workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A recipe is syntactically or semantically invalid.
    #[error("invalid recipe: {message}")]
    Recipe {
        /// Description of the invalid recipe construct.
        message: String,
    },

    /// A declared dependency cannot be resolved or installed.
    #[error("dependency resolution failed for {package}: {message}")]
    Resolution {
        /// Package name (or manifest line) that failed.
        package: String,
        /// Installer or parser diagnostic.
        message: String,
    },

    /// System toolchain package installation failed.
    #[error("toolchain installation failed: {message}")]
    Toolchain {
        /// Package-manager diagnostic.
        message: String,
    },

    /// Execution-identity creation or privilege drop failed.
    #[error("identity error: {message}")]
    Identity {
        /// Description of the identity failure.
        message: String,
    },

    /// The container entry command cannot be started.
    #[error("launch failure: {message}")]
    Launch {
        /// Description of the launch failure.
        message: String,
    },

    /// The working directory inside the rootfs already holds content.
    #[error("working-directory collision at {path}")]
    Collision {
        /// Colliding path inside the staging rootfs.
        path: PathBuf,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
