//! Launch preflight checks.
//!
//! Everything that can be rejected before the privilege drop is rejected
//! here: a launch that fails after the drop cannot be retried in-process,
//! so the privileged phase verifies the interpreter and entry file first.

use std::path::Path;

use strata_common::error::{Result, StrataError};
use strata_image::runconfig::RunConfig;

/// Directories searched for the entry interpreter, in order.
const SEARCH_PATH: &[&str] = &["bin", "usr/bin", "usr/local/bin", "sbin", "usr/sbin"];

/// Verifies the run configuration can execute inside the rootfs.
///
/// Checks that the identity is unprivileged, the working directory
/// exists, the interpreter is present on the image's search path, and the
/// entry file exists under the working directory.
///
/// # Errors
///
/// Returns a launch error describing the first failed check.
pub fn check(rootfs: &Path, config: &RunConfig) -> Result<()> {
    config.check_unprivileged()?;

    let workdir = rootfs.join(config.workdir.trim_start_matches('/'));
    if !workdir.is_dir() {
        return Err(StrataError::Launch {
            message: format!("working directory {} missing from image", config.workdir),
        });
    }

    let interpreter = config.cmd.first().ok_or_else(|| StrataError::Launch {
        message: "entry command is empty".into(),
    })?;
    if !interpreter_exists(rootfs, interpreter) {
        return Err(StrataError::Launch {
            message: format!("interpreter '{interpreter}' not found in image"),
        });
    }

    if let Some(entry) = entry_file(&config.cmd) {
        let entry_path = if entry.starts_with('/') {
            rootfs.join(entry.trim_start_matches('/'))
        } else {
            workdir.join(entry)
        };
        if !entry_path.is_file() {
            return Err(StrataError::Launch {
                message: format!(
                    "entry file '{entry}' missing under {}",
                    config.workdir
                ),
            });
        }
    }

    tracing::debug!(cmd = ?config.cmd, "preflight checks passed");
    Ok(())
}

fn interpreter_exists(rootfs: &Path, interpreter: &str) -> bool {
    if interpreter.starts_with('/') {
        return rootfs.join(interpreter.trim_start_matches('/')).is_file();
    }
    SEARCH_PATH
        .iter()
        .any(|dir| rootfs.join(dir).join(interpreter).is_file())
}

/// First non-flag argument after the interpreter, if any.
fn entry_file(cmd: &[String]) -> Option<&str> {
    cmd.iter()
        .skip(1)
        .map(String::as_str)
        .find(|arg| !arg.starts_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rootfs_with_entry(dir: &Path) {
        std::fs::create_dir_all(dir.join("usr/local/bin")).expect("mkdir bin");
        std::fs::create_dir_all(dir.join("app")).expect("mkdir app");
        std::fs::write(dir.join("usr/local/bin/python"), b"#!/bin/sh\n").expect("python");
        std::fs::write(dir.join("app/main.py"), b"print('up')\n").expect("main");
    }

    fn config() -> RunConfig {
        RunConfig {
            user: "amvera".to_string(),
            uid: 1000,
            gid: 1000,
            workdir: "/app".to_string(),
            cmd: vec!["python".to_string(), "main.py".to_string()],
            env: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn accepts_complete_rootfs() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        assert!(check(dir.path(), &config()).is_ok());
    }

    #[test]
    fn rejects_missing_interpreter() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        std::fs::remove_file(dir.path().join("usr/local/bin/python")).expect("rm");
        let err = check(dir.path(), &config()).unwrap_err();
        assert!(err.to_string().contains("interpreter"), "got: {err}");
    }

    #[test]
    fn rejects_missing_entry_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        std::fs::remove_file(dir.path().join("app/main.py")).expect("rm");
        let err = check(dir.path(), &config()).unwrap_err();
        assert!(err.to_string().contains("main.py"), "got: {err}");
    }

    #[test]
    fn rejects_missing_workdir() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        std::fs::remove_dir_all(dir.path().join("app")).expect("rm");
        let err = check(dir.path(), &config()).unwrap_err();
        assert!(err.to_string().contains("working directory"), "got: {err}");
    }

    #[test]
    fn rejects_privileged_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        let mut cfg = config();
        cfg.uid = 0;
        assert!(check(dir.path(), &cfg).is_err());
    }

    #[test]
    fn absolute_interpreter_is_resolved_inside_rootfs() {
        let dir = tempfile::tempdir().expect("tempdir");
        rootfs_with_entry(dir.path());
        let mut cfg = config();
        cfg.cmd[0] = "/usr/local/bin/python".to_string();
        assert!(check(dir.path(), &cfg).is_ok());
    }

    #[test]
    fn flags_are_not_entry_files() {
        assert_eq!(
            entry_file(&[
                "python".to_string(),
                "-u".to_string(),
                "main.py".to_string()
            ]),
            Some("main.py")
        );
        assert_eq!(entry_file(&["python".to_string()]), None);
    }
}
