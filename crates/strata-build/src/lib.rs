//! # strata-build
//!
//! Sequential image build executor.
//!
//! Consumes a validated [`strata_recipe::plan::BuildPlan`] and a build
//! context directory and produces a layered, content-addressed image. The
//! control flow is fully sequential: each step strictly happens-after the
//! previous one, the first failure aborts the whole build, and the catalog
//! is only written as the final action — a failed build never produces a
//! partial image.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod account;
pub mod builder;
pub mod deps;
pub mod runner;
pub mod source;
pub mod toolchain;
