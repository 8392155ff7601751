//! # strata-image
//!
//! Image and layer management for the Strata builder.
//!
//! Handles:
//! - **Hashing**: SHA-256 content addressing and verification.
//! - **Layers**: deterministic archiving and extraction of filesystem
//!   layers, so identical inputs always produce identical digests.
//! - **Store**: content-addressed on-disk layer storage.
//! - **Catalog**: the local JSON image index; registration is the single
//!   point at which a build becomes a visible image.
//! - **Base**: `file://` and `tar://` base-environment resolution.
//! - **Run config**: the persisted execution identity and entry command.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod base;
pub mod catalog;
pub mod hash;
pub mod layer;
pub mod runconfig;
pub mod store;
