//! Integration tests for the launch protocol.
//!
//! These tests are implemented in:
//! `crates/strata-launch/src/launcher.rs` and
//! `crates/strata-launch/src/preflight.rs`
//!
//! Covered scenarios:
//! - `new_runs_preflight`: Launcher construction rejects broken rootfs
//! - `exec_propagates_exit_code`: Child exit code surfaces unchanged
//! - `exec_missing_program_is_a_launch_error`: Spawn failure taxonomy
//! - `rejects_privileged_identity`: uid/gid 0 never reaches execution
//! - `rejects_missing_interpreter` / `rejects_missing_entry_file`:
//!   everything checkable happens before the irreversible drop
