//! Command execution inside the staging rootfs.
//!
//! The builder shells into the rootfs for the two steps that must run the
//! image's own tooling: system package installation and dependency
//! installation. The seam is a trait so tests can substitute a scripted
//! runner and platforms without `chroot` fail cleanly.

use std::path::Path;

use strata_common::error::{Result, StrataError};

/// Output from a command run inside the rootfs.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code returned by the command.
    pub exit_code: i32,
}

impl ExecOutput {
    /// Returns whether the command exited successfully.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes build-step commands against a staging rootfs.
///
/// Implementors handle the platform-specific detail of entering the
/// rootfs; the builder only sees argv in, output out.
pub trait CommandRunner: Send + Sync {
    /// Runs a command with the rootfs as filesystem root.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned. A command that
    /// runs but exits non-zero is reported through
    /// [`ExecOutput::exit_code`], not as an `Err` — the caller decides
    /// which build failure it maps to.
    fn run(&self, rootfs: &Path, argv: &[String]) -> Result<ExecOutput>;

    /// Returns whether this runner can operate on the current host.
    fn is_available(&self) -> bool;
}

/// Runner that enters the rootfs via the host `chroot` binary.
///
/// Requires Linux and root privileges.
#[derive(Debug, Default)]
pub struct ChrootRunner;

impl ChrootRunner {
    /// Creates a new chroot-based runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for ChrootRunner {
    #[cfg(target_os = "linux")]
    fn run(&self, rootfs: &Path, argv: &[String]) -> Result<ExecOutput> {
        if argv.is_empty() {
            return Err(StrataError::Recipe {
                message: "build-step command is empty".into(),
            });
        }
        tracing::info!(rootfs = %rootfs.display(), cmd = ?argv, "running build step in rootfs");

        let output = std::process::Command::new("chroot")
            .arg(rootfs)
            .args(argv)
            .output()
            .map_err(|e| StrataError::io("chroot", e))?;

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn run(&self, _rootfs: &Path, _argv: &[String]) -> Result<ExecOutput> {
        Err(StrataError::Toolchain {
            message: "rootfs command execution requires Linux".into(),
        })
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux") && which::which("chroot").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_output_success_reflects_exit_code() {
        let ok = ExecOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
        };
        let failed = ExecOutput {
            exit_code: 1,
            ..ok.clone()
        };
        assert!(ok.success());
        assert!(!failed.success());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn chroot_runner_rejects_empty_argv() {
        let runner = ChrootRunner::new();
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(runner.run(dir.path(), &[]).is_err());
    }
}
