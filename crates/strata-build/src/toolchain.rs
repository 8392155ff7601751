//! System toolchain installation and the cache-cleanliness invariant.
//!
//! Toolchain packages (compiler/linker) exist to let dependency
//! installation build native extensions; their package-index metadata must
//! not persist into the final image. The purge runs unconditionally after
//! every install and is re-verified at finalize.

use std::path::Path;

use strata_common::constants::PACKAGE_CACHE_DIRS;
use strata_common::error::{Result, StrataError};

use crate::runner::CommandRunner;

/// Package managers recognized inside a base rootfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Alpine `apk`.
    Apk,
    /// Debian/Ubuntu `apt-get`.
    Apt,
}

/// Detects the package manager of a rootfs from its filesystem markers.
///
/// # Errors
///
/// Returns a toolchain error if no supported package manager is found.
pub fn detect_package_manager(rootfs: &Path) -> Result<PackageManager> {
    if rootfs.join("etc/alpine-release").exists() || rootfs.join("sbin/apk").exists() {
        return Ok(PackageManager::Apk);
    }
    if rootfs.join("etc/debian_version").exists() || rootfs.join("usr/bin/apt-get").exists() {
        return Ok(PackageManager::Apt);
    }
    Err(StrataError::Toolchain {
        message: format!(
            "no supported package manager found in rootfs {}",
            rootfs.display()
        ),
    })
}

/// Returns the command sequence that installs the given packages.
#[must_use]
pub fn install_commands(manager: PackageManager, packages: &[String]) -> Vec<Vec<String>> {
    match manager {
        PackageManager::Apk => {
            let mut cmd = vec!["apk".to_string(), "add".to_string(), "--no-progress".to_string()];
            cmd.extend(packages.iter().cloned());
            vec![cmd]
        }
        PackageManager::Apt => {
            let mut install = vec![
                "apt-get".to_string(),
                "install".to_string(),
                "-y".to_string(),
                "--no-install-recommends".to_string(),
            ];
            install.extend(packages.iter().cloned());
            vec![
                vec!["apt-get".to_string(), "update".to_string()],
                install,
            ]
        }
    }
}

/// Installs system toolchain packages into the rootfs, then purges the
/// package-index cache.
///
/// # Errors
///
/// Returns a toolchain error if detection fails or any install command
/// exits non-zero; the purge itself surfaces I/O errors.
pub fn install_toolchain(
    runner: &dyn CommandRunner,
    rootfs: &Path,
    packages: &[String],
) -> Result<()> {
    let manager = detect_package_manager(rootfs)?;
    tracing::info!(?manager, ?packages, "installing toolchain packages");

    for argv in install_commands(manager, packages) {
        let output = runner.run(rootfs, &argv)?;
        if !output.success() {
            return Err(StrataError::Toolchain {
                message: format!(
                    "command {:?} exited with {}: {}",
                    argv,
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }
    }

    purge_package_cache(rootfs)
}

/// Removes all package-index cache directories from the rootfs.
///
/// # Errors
///
/// Returns an I/O error if a cache directory exists but cannot be
/// removed.
pub fn purge_package_cache(rootfs: &Path) -> Result<()> {
    for relative in PACKAGE_CACHE_DIRS {
        let dir = rootfs.join(relative);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| StrataError::io(&dir, e))?;
            tracing::debug!(dir = %dir.display(), "purged package-index cache");
        }
    }
    Ok(())
}

/// Verifies that no package-index cache content survived into the rootfs.
///
/// # Errors
///
/// Returns a toolchain error naming the offending directory if any cache
/// directory is present and non-empty.
pub fn verify_cache_clean(rootfs: &Path) -> Result<()> {
    for relative in PACKAGE_CACHE_DIRS {
        let dir = rootfs.join(relative);
        if !dir.exists() {
            continue;
        }
        let mut entries = std::fs::read_dir(&dir).map_err(|e| StrataError::io(&dir, e))?;
        if entries.next().is_some() {
            return Err(StrataError::Toolchain {
                message: format!(
                    "package-index cache not clean: {} is non-empty",
                    dir.display()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ExecOutput;
    use std::sync::Mutex;

    /// Runner that records argv and replies with a fixed exit code.
    struct ScriptedRunner {
        exit_code: i32,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn succeeding() -> Self {
            Self {
                exit_code: 0,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(exit_code: i32) -> Self {
            Self {
                exit_code,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, _rootfs: &Path, argv: &[String]) -> Result<ExecOutput> {
            self.calls
                .lock()
                .expect("lock")
                .push(argv.to_vec());
            Ok(ExecOutput {
                stdout: String::new(),
                stderr: "simulated failure".into(),
                exit_code: self.exit_code,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn alpine_rootfs() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("etc")).expect("mkdir");
        std::fs::write(dir.path().join("etc/alpine-release"), b"3.20\n").expect("write");
        dir
    }

    #[test]
    fn detect_apk_from_release_file() {
        let rootfs = alpine_rootfs();
        assert_eq!(
            detect_package_manager(rootfs.path()).expect("detect"),
            PackageManager::Apk
        );
    }

    #[test]
    fn detect_apt_from_debian_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("etc")).expect("mkdir");
        std::fs::write(dir.path().join("etc/debian_version"), b"12\n").expect("write");
        assert_eq!(
            detect_package_manager(dir.path()).expect("detect"),
            PackageManager::Apt
        );
    }

    #[test]
    fn detect_unknown_rootfs_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(detect_package_manager(dir.path()).is_err());
    }

    #[test]
    fn apk_install_is_single_command() {
        let cmds = install_commands(PackageManager::Apk, &["gcc".into(), "g++".into()]);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0], ["apk", "add", "--no-progress", "gcc", "g++"]);
    }

    #[test]
    fn apt_install_updates_index_first() {
        let cmds = install_commands(PackageManager::Apt, &["gcc".into()]);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], ["apt-get", "update"]);
        assert_eq!(
            cmds[1],
            ["apt-get", "install", "-y", "--no-install-recommends", "gcc"]
        );
    }

    #[test]
    fn install_toolchain_purges_cache_after_success() {
        let rootfs = alpine_rootfs();
        let cache = rootfs.path().join("var/cache/apk");
        std::fs::create_dir_all(&cache).expect("mkdir");
        std::fs::write(cache.join("APKINDEX.tar.gz"), b"index").expect("write");

        let runner = ScriptedRunner::succeeding();
        install_toolchain(&runner, rootfs.path(), &["gcc".into(), "g++".into()])
            .expect("install");

        assert!(!cache.exists());
        assert_eq!(runner.calls.lock().expect("lock").len(), 1);
        assert!(verify_cache_clean(rootfs.path()).is_ok());
    }

    #[test]
    fn install_toolchain_surfaces_nonzero_exit() {
        let rootfs = alpine_rootfs();
        let runner = ScriptedRunner::failing(2);
        let err =
            install_toolchain(&runner, rootfs.path(), &["gcc".into()]).unwrap_err();
        assert!(err.to_string().contains("toolchain"), "got: {err}");
        assert!(err.to_string().contains("simulated failure"), "got: {err}");
    }

    #[test]
    fn verify_cache_clean_accepts_empty_dir() {
        let rootfs = alpine_rootfs();
        std::fs::create_dir_all(rootfs.path().join("var/cache/apk")).expect("mkdir");
        assert!(verify_cache_clean(rootfs.path()).is_ok());
    }

    #[test]
    fn verify_cache_clean_rejects_residue() {
        let rootfs = alpine_rootfs();
        let cache = rootfs.path().join("var/lib/apt/lists");
        std::fs::create_dir_all(&cache).expect("mkdir");
        std::fs::write(cache.join("stale"), b"metadata").expect("write");
        let err = verify_cache_clean(rootfs.path()).unwrap_err();
        assert!(err.to_string().contains("not clean"), "got: {err}");
    }
}
