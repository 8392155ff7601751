//! Integration tests for the image build pipeline.
//!
//! These tests are implemented in:
//! `crates/strata-build/tests/e2e_test.rs`
//!
//! Covered scenarios:
//! - `pipeline_builds_and_registers_image`: Full recipe to catalog entry
//! - `pipeline_runs_toolchain_then_installer_in_order`: Step ordering
//! - `pipeline_rebuild_yields_identical_layer_digests`: Reproducibility
//! - `pipeline_purges_package_cache_shipped_by_base`: Cache hygiene
//! - `pipeline_failed_resolution_registers_no_image`: Failure atomicity
//! - `pipeline_failed_toolchain_registers_no_image`: Failure atomicity
//! - `pipeline_image_never_runs_privileged`: Identity invariant
//! - `pipeline_recipe_files_stay_out_of_the_image`: Context filtering
