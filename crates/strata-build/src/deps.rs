//! Dependency-manifest installation.
//!
//! The manifest is parsed and validated before any command runs: a
//! malformed line aborts the build without touching the rootfs. The
//! installer is invoked with its package cache disabled so no local cache
//! is folded into the image.

use std::path::Path;

use strata_common::error::{Result, StrataError};
use strata_recipe::manifest::{self, Dependency};

use crate::runner::CommandRunner;

/// Returns the installer invocation for a manifest inside the rootfs.
///
/// The cache is disabled explicitly; nothing the installer downloads may
/// persist outside the installed packages themselves.
#[must_use]
pub fn install_command(manifest_path_in_image: &str) -> Vec<String> {
    vec![
        "python3".to_string(),
        "-m".to_string(),
        "pip".to_string(),
        "install".to_string(),
        "--no-cache-dir".to_string(),
        "--requirement".to_string(),
        manifest_path_in_image.to_string(),
    ]
}

/// Installs the manifest dependencies into the rootfs.
///
/// Reads the manifest from the build context, validates it, copies it into
/// the image working directory, and runs the installer through the runner.
/// Returns the parsed dependency set for reporting.
///
/// # Errors
///
/// Returns a resolution error if the manifest is missing or malformed, or
/// if the installer exits non-zero.
pub fn install_dependencies(
    runner: &dyn CommandRunner,
    rootfs: &Path,
    workdir: &str,
    context: &Path,
    manifest_rel: &str,
) -> Result<Vec<Dependency>> {
    let manifest_path = context.join(manifest_rel);
    let content = std::fs::read_to_string(&manifest_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StrataError::Resolution {
                package: manifest_rel.to_string(),
                message: "dependency manifest not found in build context".into(),
            }
        } else {
            StrataError::io(&manifest_path, e)
        }
    })?;

    let dependencies = manifest::parse_manifest(&content)?;
    tracing::info!(
        manifest = manifest_rel,
        count = dependencies.len(),
        "installing manifest dependencies"
    );

    let file_name = Path::new(manifest_rel)
        .file_name()
        .ok_or_else(|| StrataError::Resolution {
            package: manifest_rel.to_string(),
            message: "manifest path has no file name".into(),
        })?;
    let workdir_in_rootfs = rootfs.join(workdir.trim_start_matches('/'));
    std::fs::create_dir_all(&workdir_in_rootfs)
        .map_err(|e| StrataError::io(&workdir_in_rootfs, e))?;
    let dest = workdir_in_rootfs.join(file_name);
    let _ = std::fs::copy(&manifest_path, &dest).map_err(|e| StrataError::io(&dest, e))?;

    if dependencies.is_empty() {
        tracing::debug!("manifest declares no dependencies, skipping installer");
        return Ok(dependencies);
    }

    let in_image = format!(
        "{}/{}",
        workdir.trim_end_matches('/'),
        file_name.to_string_lossy()
    );
    let argv = install_command(&in_image);
    let output = runner.run(rootfs, &argv)?;
    if !output.success() {
        return Err(StrataError::Resolution {
            package: dependencies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            message: format!(
                "installer exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            ),
        });
    }

    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ExecOutput;
    use std::sync::Mutex;

    struct ScriptedRunner {
        exit_code: i32,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn with_exit(exit_code: i32) -> Self {
            Self {
                exit_code,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, _rootfs: &Path, argv: &[String]) -> Result<ExecOutput> {
            self.calls.lock().expect("lock").push(argv.to_vec());
            Ok(ExecOutput {
                stdout: String::new(),
                stderr: "No matching distribution found".into(),
                exit_code: self.exit_code,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let context = dir.path().join("context");
        let rootfs = dir.path().join("rootfs");
        std::fs::create_dir_all(&context).expect("mkdir");
        std::fs::create_dir_all(&rootfs).expect("mkdir");
        (dir, context, rootfs)
    }

    #[test]
    fn install_copies_manifest_and_runs_installer() {
        let (_dir, context, rootfs) = fixture();
        std::fs::write(context.join("requirements.txt"), "flask==3.0.2\n").expect("write");

        let runner = ScriptedRunner::with_exit(0);
        let deps = install_dependencies(&runner, &rootfs, "/app", &context, "requirements.txt")
            .expect("install");

        assert_eq!(deps.len(), 1);
        assert!(rootfs.join("app/requirements.txt").exists());

        let calls = runner.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            [
                "python3",
                "-m",
                "pip",
                "install",
                "--no-cache-dir",
                "--requirement",
                "/app/requirements.txt"
            ]
        );
    }

    #[test]
    fn install_empty_manifest_skips_installer() {
        let (_dir, context, rootfs) = fixture();
        std::fs::write(context.join("requirements.txt"), "# none\n").expect("write");

        let runner = ScriptedRunner::with_exit(0);
        let deps = install_dependencies(&runner, &rootfs, "/app", &context, "requirements.txt")
            .expect("install");

        assert!(deps.is_empty());
        assert!(runner.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn install_missing_manifest_is_resolution_failure() {
        let (_dir, context, rootfs) = fixture();
        let runner = ScriptedRunner::with_exit(0);
        let err =
            install_dependencies(&runner, &rootfs, "/app", &context, "requirements.txt")
                .unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn install_malformed_manifest_fails_before_any_command() {
        let (_dir, context, rootfs) = fixture();
        std::fs::write(context.join("requirements.txt"), "???bad line\n").expect("write");

        let runner = ScriptedRunner::with_exit(0);
        let result =
            install_dependencies(&runner, &rootfs, "/app", &context, "requirements.txt");

        assert!(result.is_err());
        assert!(runner.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn install_unresolvable_dependency_is_fatal() {
        let (_dir, context, rootfs) = fixture();
        std::fs::write(context.join("requirements.txt"), "flask==9.9.9\n").expect("write");

        let runner = ScriptedRunner::with_exit(1);
        let err = install_dependencies(&runner, &rootfs, "/app", &context, "requirements.txt")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("flask==9.9.9"), "got: {msg}");
        assert!(msg.contains("No matching distribution"), "got: {msg}");
    }
}
