//! # strata-launch
//!
//! Privilege-dropping process launcher.
//!
//! Launching an image is a strict two-phase protocol: a privileged phase
//! that may touch the rootfs and host identity, then an irreversible drop
//! to the image's restricted account, after which only the entry command
//! runs. The one-way transition is encoded in the type system — the
//! privileged launcher is consumed by the drop and nothing in the
//! unprivileged API can restore root.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod launcher;
pub mod preflight;

pub use launcher::{Launcher, Privileged, Unprivileged};
